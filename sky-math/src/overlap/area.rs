use nalgebra::Vector3;

/// Signed solid angle of the spherical triangle (a, b, c).
///
/// Van Oosterom & Strackee (1983). The triple product is taken on edge
/// vectors so arcsecond-sized triangles keep their precision.
pub(super) fn triangle_solid_angle(a: &Vector3<f64>, b: &Vector3<f64>, c: &Vector3<f64>) -> f64 {
    let triple = a.dot(&(b - a).cross(&(c - a)));
    let denom = 1.0 + a.dot(b) + b.dot(c) + c.dot(a);
    2.0 * triple.atan2(denom)
}

/// Signed area of a spherical polygon; positive for counter-clockwise
/// winding seen from outside the sphere
pub(super) fn signed_polygon_area(vertices: &[Vector3<f64>]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }

    let anchor = &vertices[0];
    vertices[1..]
        .windows(2)
        .map(|pair| triangle_solid_angle(anchor, &pair[0], &pair[1]))
        .sum()
}

/// Area in steradians of a spherical polygon given as unit vectors.
///
/// The polygon must be convex and smaller than a hemisphere; winding does
/// not matter.
pub fn spherical_polygon_area(vertices: &[Vector3<f64>]) -> f64 {
    signed_polygon_area(vertices).abs()
}
