//! The pixel↔world contract shared by all projections

use ndarray::Array2;

use crate::{CelestialFrame, ProjectionError};

/// A deterministic mapping between pixel positions and sky coordinates.
///
/// Pixel coordinates are 0-indexed: the centre of the first pixel is
/// `(0.0, 0.0)` and its edges sit at `±0.5`. World coordinates are
/// (longitude, latitude) in degrees, expressed in [`Projection::frame`].
///
/// Positions that have no image under the projection (for example points
/// behind a gnomonic tangent plane) come back as NaN rather than an error,
/// so grid transforms stay total. Errors are reserved for failures of the
/// projection itself.
pub trait Projection: Send + Sync + std::fmt::Debug {
    /// Pixel position to (longitude, latitude) in degrees
    fn pix2world(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError>;

    /// (longitude, latitude) in degrees to pixel position
    fn world2pix(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError>;

    /// Celestial frame the world coordinates are expressed in
    fn frame(&self) -> CelestialFrame;

    /// Number of image axes described by this projection
    fn naxis(&self) -> usize {
        2
    }

    /// Apply [`Projection::pix2world`] to every element of a pair of grids
    fn pix2world_grid(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), ProjectionError> {
        map_grid(x, y, |a, b| self.pix2world(a, b))
    }

    /// Apply [`Projection::world2pix`] to every element of a pair of grids
    fn world2pix_grid(
        &self,
        lon: &Array2<f64>,
        lat: &Array2<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), ProjectionError> {
        map_grid(lon, lat, |a, b| self.world2pix(a, b))
    }
}

pub(crate) fn map_grid<F>(
    a: &Array2<f64>,
    b: &Array2<f64>,
    mut f: F,
) -> Result<(Array2<f64>, Array2<f64>), ProjectionError>
where
    F: FnMut(f64, f64) -> Result<(f64, f64), ProjectionError>,
{
    if a.dim() != b.dim() {
        return Err(ProjectionError::ShapeMismatch(
            a.shape().to_vec(),
            b.shape().to_vec(),
        ));
    }

    let mut out_a = Array2::zeros(a.raw_dim());
    let mut out_b = Array2::zeros(b.raw_dim());
    for ((idx, &va), &vb) in a.indexed_iter().zip(b.iter()) {
        let (ra, rb) = f(va, vb)?;
        out_a[idx] = ra;
        out_b[idx] = rb;
    }

    Ok((out_a, out_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CarProjection;
    use ndarray::array;

    #[test]
    fn test_grid_shape_mismatch() {
        let proj = CarProjection::new([0.0, 0.0], [0.0, 0.0], [1.0, 1.0], CelestialFrame::Icrs)
            .unwrap();
        let x = Array2::<f64>::zeros((2, 3));
        let y = Array2::<f64>::zeros((3, 2));

        let err = proj.pix2world_grid(&x, &y).unwrap_err();
        assert_eq!(err, ProjectionError::ShapeMismatch(vec![2, 3], vec![3, 2]));
    }

    #[test]
    fn test_grid_matches_pointwise() {
        let proj =
            CarProjection::new([1.0, 1.0], [10.0, 5.0], [-0.5, 0.5], CelestialFrame::Icrs).unwrap();
        let x = array![[0.0, 1.0], [2.0, 3.0]];
        let y = array![[0.0, 0.0], [1.0, 1.0]];

        let (lon, lat) = proj.pix2world_grid(&x, &y).unwrap();
        for ((idx, &xv), &yv) in x.indexed_iter().zip(y.iter()) {
            let (l, b) = proj.pix2world(xv, yv).unwrap();
            assert_eq!(lon[idx], l);
            assert_eq!(lat[idx], b);
        }
    }
}
