//! Gnomonic (TAN) projection.
//!
//! Every great circle on the sky maps to a straight line on the tangent
//! plane, which makes this the natural projection for narrow-field images.
//! The forward and inverse formulas follow Calabretta & Greisen (2002),
//! FITS WCS Paper II, §5.1.3.
//!
//! The linear part maps pixel offsets from the reference pixel to
//! intermediate world coordinates in degrees through a 2×2 `CD` matrix.

use nalgebra::{Matrix2, Vector2};

use crate::{CelestialFrame, Projection, ProjectionError};

// Points closer than this to the plane through the sphere centre parallel to
// the tangent plane have no finite image.
const MIN_DENOMINATOR: f64 = 1e-12;

/// Gnomonic projection about a reference point on the sky
#[derive(Debug, Clone)]
pub struct TanProjection {
    /// Reference pixel (0-indexed) that maps to `crval`
    crpix: Vector2<f64>,
    /// Reference sky position (lon, lat) in radians
    crval: (f64, f64),
    /// Pixel offset to intermediate world coordinates, degrees per pixel
    cd: Matrix2<f64>,
    cd_inv: Matrix2<f64>,
    frame: CelestialFrame,
}

impl TanProjection {
    /// Create a projection from an explicit `CD` matrix.
    ///
    /// # Arguments
    /// * `crpix` - Reference pixel (x, y), 0-indexed
    /// * `crval` - Sky position of the reference pixel (lon, lat) in degrees
    /// * `cd` - Row-major linear transform in degrees per pixel
    /// * `frame` - Celestial frame of the world coordinates
    ///
    /// # Errors
    /// * `ProjectionError::SingularMatrix` - If `cd` cannot be inverted
    /// * `ProjectionError::InvalidParameter` - If `crval` is off the sphere
    pub fn new(
        crpix: [f64; 2],
        crval: [f64; 2],
        cd: [[f64; 2]; 2],
        frame: CelestialFrame,
    ) -> Result<Self, ProjectionError> {
        if !(-90.0..=90.0).contains(&crval[1]) || !crval[0].is_finite() {
            return Err(ProjectionError::InvalidParameter(format!(
                "reference position ({}, {}) is not on the sphere",
                crval[0], crval[1]
            )));
        }

        let cd = Matrix2::new(cd[0][0], cd[0][1], cd[1][0], cd[1][1]);
        let cd_inv = cd
            .try_inverse()
            .filter(|inv| inv.iter().all(|v| v.is_finite()))
            .ok_or(ProjectionError::SingularMatrix(cd.determinant()))?;

        Ok(Self {
            crpix: Vector2::new(crpix[0], crpix[1]),
            crval: (crval[0].to_radians(), crval[1].to_radians()),
            cd,
            cd_inv,
            frame,
        })
    }

    /// Create a projection from a pixel scale and position angle.
    ///
    /// Longitude increases to the left (negative x direction), the usual
    /// convention for sky images viewed from inside the sphere.
    ///
    /// # Arguments
    /// * `scale_deg` - Pixel size in degrees
    /// * `rotation_deg` - Rotation of the pixel grid, counter-clockwise
    pub fn from_scale(
        crpix: [f64; 2],
        crval: [f64; 2],
        scale_deg: f64,
        rotation_deg: f64,
        frame: CelestialFrame,
    ) -> Result<Self, ProjectionError> {
        if !(scale_deg.is_finite() && scale_deg > 0.0) {
            return Err(ProjectionError::InvalidParameter(format!(
                "pixel scale must be positive, got {scale_deg}"
            )));
        }

        let (sin_t, cos_t) = rotation_deg.to_radians().sin_cos();
        let cd = [
            [-scale_deg * cos_t, scale_deg * sin_t],
            [scale_deg * sin_t, scale_deg * cos_t],
        ];
        Self::new(crpix, crval, cd, frame)
    }

    /// Reference sky position (lon, lat) in degrees
    pub fn crval(&self) -> (f64, f64) {
        (self.crval.0.to_degrees(), self.crval.1.to_degrees())
    }
}

impl Projection for TanProjection {
    fn pix2world(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let offset = Vector2::new(x, y) - self.crpix;
        let plane = (self.cd * offset).map(f64::to_radians);
        let (xi, eta) = (plane.x, plane.y);

        let (crval_lon, crval_lat) = self.crval;
        let (sin_lat0, cos_lat0) = crval_lat.sin_cos();
        let rho = xi.hypot(eta);

        if rho == 0.0 {
            return Ok(self.crval());
        }

        let c = rho.atan();
        let (sin_c, cos_c) = c.sin_cos();

        let lat = (cos_c * sin_lat0 + eta * sin_c * cos_lat0 / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lon = crval_lon + (xi * sin_c).atan2(rho * cos_lat0 * cos_c - eta * sin_lat0 * sin_c);

        Ok((lon.to_degrees().rem_euclid(360.0), lat.to_degrees()))
    }

    fn world2pix(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        let (lon, lat) = (lon.to_radians(), lat.to_radians());
        let (crval_lon, crval_lat) = self.crval;

        let dlon = lon - crval_lon;
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lat0, cos_lat0) = crval_lat.sin_cos();
        let cos_dlon = dlon.cos();

        let denom = sin_lat * sin_lat0 + cos_lat * cos_lat0 * cos_dlon;
        if denom.is_nan() || denom <= MIN_DENOMINATOR {
            return Ok((f64::NAN, f64::NAN));
        }

        let xi = cos_lat * dlon.sin() / denom;
        let eta = (sin_lat * cos_lat0 - cos_lat * sin_lat0 * cos_dlon) / denom;

        let plane = Vector2::new(xi.to_degrees(), eta.to_degrees());
        let pixel = self.cd_inv * plane + self.crpix;
        Ok((pixel.x, pixel.y))
    }

    fn frame(&self) -> CelestialFrame {
        self.frame
    }
}
