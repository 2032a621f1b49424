//! Celestial reference frames and conversion between them

use nalgebra::{Matrix3, Vector3};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::projection::map_grid;
use crate::ProjectionError;

/// ICRS to Galactic rotation (Hipparcos definition, as adopted by the IAU)
#[rustfmt::skip]
const ICRS_TO_GALACTIC: [f64; 9] = [
    -0.054_875_560_416_215_4, -0.873_437_090_234_885_0, -0.483_835_015_548_713_2,
     0.494_109_427_875_583_7, -0.444_829_629_960_011_2,  0.746_982_244_497_218_9,
    -0.867_666_149_019_004_7, -0.198_076_373_431_201_5,  0.455_983_776_175_066_9,
];

/// Celestial reference frame of a projection's world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CelestialFrame {
    /// International Celestial Reference System (RA, Dec)
    #[default]
    Icrs,
    /// Galactic coordinates (l, b)
    Galactic,
}

impl CelestialFrame {
    fn frame_to_icrs(self) -> Matrix3<f64> {
        match self {
            CelestialFrame::Icrs => Matrix3::identity(),
            CelestialFrame::Galactic => icrs_to_galactic().transpose(),
        }
    }

    fn icrs_to_frame(self) -> Matrix3<f64> {
        match self {
            CelestialFrame::Icrs => Matrix3::identity(),
            CelestialFrame::Galactic => icrs_to_galactic(),
        }
    }

    /// Rotation taking unit vectors in `self` to unit vectors in `to`
    pub fn rotation_to(self, to: CelestialFrame) -> Matrix3<f64> {
        to.icrs_to_frame() * self.frame_to_icrs()
    }
}

impl fmt::Display for CelestialFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CelestialFrame::Icrs => write!(f, "icrs"),
            CelestialFrame::Galactic => write!(f, "galactic"),
        }
    }
}

impl std::str::FromStr for CelestialFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icrs" | "fk5" | "equatorial" => Ok(CelestialFrame::Icrs),
            "galactic" => Ok(CelestialFrame::Galactic),
            other => Err(format!("Unknown celestial frame: {other}")),
        }
    }
}

fn icrs_to_galactic() -> Matrix3<f64> {
    Matrix3::from_row_slice(&ICRS_TO_GALACTIC)
}

fn rotate_lonlat(rotation: &Matrix3<f64>, lon: f64, lat: f64) -> (f64, f64) {
    if !lon.is_finite() || !lat.is_finite() {
        return (f64::NAN, f64::NAN);
    }

    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    let v = Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
    let r = rotation * v;

    let out_lon = r.y.atan2(r.x).to_degrees().rem_euclid(360.0);
    let out_lat = r.z.clamp(-1.0, 1.0).asin().to_degrees();
    (out_lon, out_lat)
}

/// Re-express (lon, lat) in degrees from frame `from` into frame `to`.
///
/// Coordinates are returned untouched when the frames match.
pub fn convert(lon: f64, lat: f64, from: CelestialFrame, to: CelestialFrame) -> (f64, f64) {
    if from == to {
        return (lon, lat);
    }
    rotate_lonlat(&from.rotation_to(to), lon, lat)
}

/// Grid version of [`convert`]
pub fn convert_grid(
    lon: &Array2<f64>,
    lat: &Array2<f64>,
    from: CelestialFrame,
    to: CelestialFrame,
) -> Result<(Array2<f64>, Array2<f64>), ProjectionError> {
    if from == to {
        return map_grid(lon, lat, |a, b| Ok((a, b)));
    }

    let rotation = from.rotation_to(to);
    map_grid(lon, lat, |a, b| Ok(rotate_lonlat(&rotation, a, b)))
}
