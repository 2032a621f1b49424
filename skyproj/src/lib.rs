//! Sky projections for image pixel grids
//!
//! This crate maps 0-indexed pixel positions to celestial coordinates and
//! back, and re-expresses celestial coordinates between reference frames.
//! World coordinates are (longitude, latitude) pairs in degrees.
//!
//! # Projections
//!
//! - [`TanProjection`]: gnomonic (tangent plane) projection, the usual choice
//!   for narrow-field telescope images
//! - [`CarProjection`]: plate carrée, linear in longitude and latitude
//!
//! Both implement [`Projection`], which also provides vectorised grid
//! transforms over `ndarray` coordinate arrays.

pub mod car;
pub mod error;
pub mod frame;
pub mod projection;
pub mod spec;
pub mod tan;

pub use car::CarProjection;
pub use error::ProjectionError;
pub use frame::{convert, convert_grid, CelestialFrame};
pub use projection::Projection;
pub use spec::ProjectionSpec;
pub use tan::TanProjection;
