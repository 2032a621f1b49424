//! Spherical geometry for flux-conserving reprojection.
//!
//! Pixel footprints on the celestial sphere are quadrilaterals bounded by
//! great-circle arcs. This crate computes the solid angle shared by two such
//! quadrilaterals, which is the primitive the reprojection kernel uses to
//! split a source pixel's flux across destination pixels.

pub mod overlap;

pub use overlap::{
    lonlat_to_unit, spherical_polygon_area, spherical_quad_overlap, GeometryError, Overlap,
    OverlapArea, OverlapStatus, SphericalPolygonOverlap,
};
