//! Serializable projection descriptions
//!
//! Lets configuration files name a projection without the caller having to
//! construct it by hand:
//!
//! ```json
//! { "type": "tan", "crpix": [49.5, 49.5], "crval": [83.63, -5.39], "scale_deg": 0.001 }
//! ```

use serde::{Deserialize, Serialize};

use crate::{CarProjection, CelestialFrame, Projection, ProjectionError, TanProjection};

/// Parameters for one of the supported projections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProjectionSpec {
    Tan {
        crpix: [f64; 2],
        crval: [f64; 2],
        scale_deg: f64,
        #[serde(default)]
        rotation_deg: f64,
        #[serde(default)]
        frame: CelestialFrame,
    },
    Car {
        crpix: [f64; 2],
        crval: [f64; 2],
        cdelt: [f64; 2],
        #[serde(default)]
        frame: CelestialFrame,
    },
}

impl ProjectionSpec {
    /// Construct the described projection
    pub fn build(&self) -> Result<Box<dyn Projection>, ProjectionError> {
        match *self {
            ProjectionSpec::Tan {
                crpix,
                crval,
                scale_deg,
                rotation_deg,
                frame,
            } => Ok(Box::new(TanProjection::from_scale(
                crpix,
                crval,
                scale_deg,
                rotation_deg,
                frame,
            )?)),
            ProjectionSpec::Car {
                crpix,
                crval,
                cdelt,
                frame,
            } => Ok(Box::new(CarProjection::new(crpix, crval, cdelt, frame)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tan_with_defaults() {
        let json = r#"{ "type": "tan", "crpix": [49.5, 49.5], "crval": [83.63, -5.39], "scale_deg": 0.001 }"#;
        let spec: ProjectionSpec = serde_json::from_str(json).unwrap();

        assert_eq!(
            spec,
            ProjectionSpec::Tan {
                crpix: [49.5, 49.5],
                crval: [83.63, -5.39],
                scale_deg: 0.001,
                rotation_deg: 0.0,
                frame: CelestialFrame::Icrs,
            }
        );
        assert_eq!(spec.build().unwrap().frame(), CelestialFrame::Icrs);
    }

    #[test]
    fn test_parse_car_galactic() {
        let json = r#"{ "type": "car", "crpix": [0, 0], "crval": [0, 0], "cdelt": [-0.5, 0.5], "frame": "galactic" }"#;
        let spec: ProjectionSpec = serde_json::from_str(json).unwrap();
        let proj = spec.build().unwrap();
        assert_eq!(proj.frame(), CelestialFrame::Galactic);
    }

    #[test]
    fn test_build_propagates_errors() {
        let spec = ProjectionSpec::Tan {
            crpix: [0.0, 0.0],
            crval: [0.0, 0.0],
            scale_deg: -1.0,
            rotation_deg: 0.0,
            frame: CelestialFrame::Icrs,
        };
        assert!(matches!(
            spec.build(),
            Err(ProjectionError::InvalidParameter(_))
        ));
    }
}
