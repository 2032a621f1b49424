//! Exact overlap area between spherical quadrilaterals
//!
//! The subject quad is clipped against every great-circle edge of the clip
//! quad, and the solid angle of what remains is summed as a triangle fan.
//! Both quads are given as four (longitude, latitude) vertices in radians.

mod area;
mod clip;

use nalgebra::Vector3;
use thiserror::Error;

pub use area::spherical_polygon_area;
use area::signed_polygon_area;
use clip::clip_polygon;

/// Errors that can occur while computing spherical overlaps
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Non-finite vertex ({lon}, {lat}) in spherical quad")]
    NonFiniteVertex { lon: f64, lat: f64 },
}

/// How an overlap result was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapStatus {
    /// The quads share a region of positive or numerically zero area
    Intersecting,
    /// Clipping removed every vertex of the subject quad
    Disjoint,
    /// The clip quad has no orientable area (collapsed or collinear vertices)
    Degenerate,
}

/// Area of intersection in steradians, with the status of the computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub area: f64,
    pub status: OverlapStatus,
}

impl Overlap {
    fn empty(status: OverlapStatus) -> Self {
        Self { area: 0.0, status }
    }
}

/// Source of spherical quad intersection areas.
///
/// Implementations must be pure: the reprojection engine calls them
/// concurrently from many worker threads.
pub trait OverlapArea: Send + Sync {
    /// Area shared by quad A and quad B, vertices in radians.
    ///
    /// Quad B must be convex. Either winding is accepted for both quads.
    fn overlap(
        &self,
        a_lon: &[f64; 4],
        a_lat: &[f64; 4],
        b_lon: &[f64; 4],
        b_lat: &[f64; 4],
    ) -> Result<Overlap, GeometryError>;
}

/// Default overlap primitive backed by [`spherical_quad_overlap`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalPolygonOverlap;

impl OverlapArea for SphericalPolygonOverlap {
    fn overlap(
        &self,
        a_lon: &[f64; 4],
        a_lat: &[f64; 4],
        b_lon: &[f64; 4],
        b_lat: &[f64; 4],
    ) -> Result<Overlap, GeometryError> {
        spherical_quad_overlap(a_lon, a_lat, b_lon, b_lat)
    }
}

/// Convert a (longitude, latitude) pair in radians to a unit vector
pub fn lonlat_to_unit(lon: f64, lat: f64) -> Vector3<f64> {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

fn quad_vertices(lon: &[f64; 4], lat: &[f64; 4]) -> Result<[Vector3<f64>; 4], GeometryError> {
    let mut vertices = [Vector3::zeros(); 4];
    for (k, vertex) in vertices.iter_mut().enumerate() {
        if !lon[k].is_finite() || !lat[k].is_finite() {
            return Err(GeometryError::NonFiniteVertex {
                lon: lon[k],
                lat: lat[k],
            });
        }
        *vertex = lonlat_to_unit(lon[k], lat[k]);
    }
    Ok(vertices)
}

/// Compute the solid angle shared by two spherical quadrilaterals.
///
/// # Arguments
/// * `a_lon`, `a_lat` - Vertices of the subject quad in radians
/// * `b_lon`, `b_lat` - Vertices of the (convex) clip quad in radians
///
/// # Returns
/// * `Ok(Overlap)` - Intersection area in steradians and how it was obtained
/// * `Err(GeometryError::NonFiniteVertex)` - If any vertex is NaN or infinite
///
/// Calling with the same quad twice yields that quad's own area, which is how
/// callers turn a raw intersection into a coverage fraction.
pub fn spherical_quad_overlap(
    a_lon: &[f64; 4],
    a_lat: &[f64; 4],
    b_lon: &[f64; 4],
    b_lat: &[f64; 4],
) -> Result<Overlap, GeometryError> {
    let subject = quad_vertices(a_lon, a_lat)?;
    let clip = quad_vertices(b_lon, b_lat)?;

    let clip_area = signed_polygon_area(&clip);
    if clip_area == 0.0 || !clip_area.is_finite() {
        return Ok(Overlap::empty(OverlapStatus::Degenerate));
    }

    let clipped = clip_polygon(&subject, &clip, clip_area.signum());
    if clipped.len() < 3 {
        return Ok(Overlap::empty(OverlapStatus::Disjoint));
    }

    Ok(Overlap {
        area: spherical_polygon_area(&clipped),
        status: OverlapStatus::Intersecting,
    })
}
