use nalgebra::Vector3;

/// Point where the chord s→e crosses the great circle with distances `ds`, `de`
fn edge_crossing(s: &Vector3<f64>, e: &Vector3<f64>, ds: f64, de: f64) -> Vector3<f64> {
    let t = ds / (ds - de);
    (s + (e - s) * t).normalize()
}

/// Sutherland–Hodgman clipping of `subject` against the convex polygon `clip`.
///
/// `orientation` is the sign of the clip polygon's signed area; interior
/// points satisfy `orientation * (c_i × c_{i+1}) · p >= 0` for every edge.
pub(super) fn clip_polygon(
    subject: &[Vector3<f64>],
    clip: &[Vector3<f64>],
    orientation: f64,
) -> Vec<Vector3<f64>> {
    let mut output = subject.to_vec();
    let n = clip.len();

    for i in 0..n {
        if output.is_empty() {
            break;
        }

        let normal = clip[i].cross(&clip[(i + 1) % n]) * orientation;
        let input = std::mem::take(&mut output);

        let mut prev = input[input.len() - 1];
        let mut prev_d = normal.dot(&prev);

        for current in input {
            let cur_d = normal.dot(&current);
            if cur_d >= 0.0 {
                if prev_d < 0.0 {
                    output.push(edge_crossing(&prev, &current, prev_d, cur_d));
                }
                output.push(current);
            } else if prev_d >= 0.0 {
                output.push(edge_crossing(&prev, &current, prev_d, cur_d));
            }
            prev = current;
            prev_d = cur_d;
        }
    }

    output
}
