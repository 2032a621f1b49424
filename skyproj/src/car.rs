//! Plate carrée (CAR) projection: longitude and latitude linear in pixels

use crate::{CelestialFrame, Projection, ProjectionError};

/// Linear longitude/latitude grid about a reference point
#[derive(Debug, Clone)]
pub struct CarProjection {
    crpix: [f64; 2],
    crval: [f64; 2],
    /// Degrees per pixel along x and y
    cdelt: [f64; 2],
    frame: CelestialFrame,
}

impl CarProjection {
    /// Create a plate carrée grid.
    ///
    /// # Errors
    /// * `ProjectionError::InvalidParameter` - If either `cdelt` is zero or
    ///   non-finite, or `crval` latitude is outside ±90°
    pub fn new(
        crpix: [f64; 2],
        crval: [f64; 2],
        cdelt: [f64; 2],
        frame: CelestialFrame,
    ) -> Result<Self, ProjectionError> {
        if cdelt.iter().any(|d| !d.is_finite() || *d == 0.0) {
            return Err(ProjectionError::InvalidParameter(format!(
                "pixel increments must be finite and non-zero, got {cdelt:?}"
            )));
        }
        if !(-90.0..=90.0).contains(&crval[1]) {
            return Err(ProjectionError::InvalidParameter(format!(
                "reference latitude {} is outside [-90, 90]",
                crval[1]
            )));
        }

        Ok(Self {
            crpix,
            crval,
            cdelt,
            frame,
        })
    }
}

impl Projection for CarProjection {
    fn pix2world(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let lon = self.crval[0] + self.cdelt[0] * (x - self.crpix[0]);
        let lat = self.crval[1] + self.cdelt[1] * (y - self.crpix[1]);

        if !(-90.0..=90.0).contains(&lat) {
            return Ok((f64::NAN, f64::NAN));
        }
        Ok((lon.rem_euclid(360.0), lat))
    }

    fn world2pix(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        // Longitude is taken on the branch centred on the reference longitude
        let dlon = (lon - self.crval[0] + 180.0).rem_euclid(360.0) - 180.0;
        let x = self.crpix[0] + dlon / self.cdelt[0];
        let y = self.crpix[1] + (lat - self.crval[1]) / self.cdelt[1];
        Ok((x, y))
    }

    fn frame(&self) -> CelestialFrame {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_mapping() {
        let proj =
            CarProjection::new([10.0, 10.0], [20.0, -5.0], [-0.1, 0.1], CelestialFrame::Galactic)
                .unwrap();
        let (lon, lat) = proj.pix2world(12.0, 15.0).unwrap();
        assert_relative_eq!(lon, 19.8, epsilon = 1e-12);
        assert_relative_eq!(lat, -4.5, epsilon = 1e-12);

        let (x, y) = proj.world2pix(lon, lat).unwrap();
        assert_relative_eq!(x, 12.0, epsilon = 1e-9);
        assert_relative_eq!(y, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_longitude_wraps_around_reference() {
        let proj =
            CarProjection::new([0.0, 0.0], [0.0, 0.0], [1.0, 1.0], CelestialFrame::Icrs).unwrap();
        let (x, _) = proj.world2pix(359.0, 0.0).unwrap();
        assert_relative_eq!(x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_beyond_pole_is_nan() {
        let proj =
            CarProjection::new([0.0, 0.0], [0.0, 85.0], [1.0, 1.0], CelestialFrame::Icrs).unwrap();
        let (lon, lat) = proj.pix2world(0.0, 10.0).unwrap();
        assert!(lon.is_nan() && lat.is_nan());
    }

    #[test]
    fn test_zero_increment_rejected() {
        let err = CarProjection::new([0.0, 0.0], [0.0, 0.0], [0.0, 1.0], CelestialFrame::Icrs)
            .unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidParameter(_)));
    }
}
