//! Corner grids and the source→destination coordinate mapping.
//!
//! Pixels are treated as areas, so every image is described by the
//! positions of its pixel *edges*: corner `(j, i)` sits at the continuous
//! pixel position `(i - 0.5, j - 0.5)`. The mapping is built once per
//! request and shared read-only by every worker.
//!
//! # Pipeline
//!
//! 1. Source corners in source pixel space
//! 2. Source corners in world space (source projection, source frame)
//! 3. Destination corners in destination pixel and world space
//! 4. Source world corners re-expressed in the destination frame
//! 5. Source corners in destination pixel space

use log::debug;
use ndarray::Array2;
use skyproj::{convert_grid, Projection};

use crate::{GridShape, ReprojectError};

/// Coordinate pairs at the pixel edges of an image, shape `(rows + 1, cols + 1)`
#[derive(Debug, Clone, PartialEq)]
pub struct CornerGrid {
    /// First coordinate (pixel x or longitude)
    pub x: Array2<f64>,
    /// Second coordinate (pixel y or latitude)
    pub y: Array2<f64>,
}

impl CornerGrid {
    /// Pixel-space corners of an image with the given shape
    pub fn pixel_edges(shape: GridShape) -> Self {
        let dims = shape.corner_dims();
        Self {
            x: Array2::from_shape_fn(dims, |(_, i)| i as f64 - 0.5),
            y: Array2::from_shape_fn(dims, |(j, _)| j as f64 - 0.5),
        }
    }

    /// The four corners of pixel `(row, col)` in reversed winding.
    ///
    /// Corners are gathered as (j, i), (j, i+1), (j+1, i+1), (j+1, i) and
    /// returned in the opposite order, which is the winding the overlap
    /// primitive is always fed.
    pub fn quad(&self, row: usize, col: usize) -> ([f64; 4], [f64; 4]) {
        let index = [
            [row + 1, col],
            [row + 1, col + 1],
            [row, col + 1],
            [row, col],
        ];
        (index.map(|k| self.x[k]), index.map(|k| self.y[k]))
    }

    /// [`CornerGrid::quad`] converted from degrees to radians
    pub fn quad_radians(&self, row: usize, col: usize) -> ([f64; 4], [f64; 4]) {
        let (x, y) = self.quad(row, col);
        (x.map(f64::to_radians), y.map(f64::to_radians))
    }
}

/// Every corner grid needed to resample one source image onto one destination
#[derive(Debug, Clone)]
pub struct CornerMapping {
    pub src_shape: GridShape,
    pub dst_shape: GridShape,
    /// Source corners in source pixel space
    pub src_pixel: CornerGrid,
    /// Source corners in world space, source frame (degrees)
    pub src_world: CornerGrid,
    /// Source corners in world space, destination frame (degrees)
    pub src_world_in_dst_frame: CornerGrid,
    /// Source corners in destination pixel space
    pub src_in_dst_pixel: CornerGrid,
    /// Destination corners in destination pixel space
    pub dst_pixel: CornerGrid,
    /// Destination corners in world space, destination frame (degrees)
    pub dst_world: CornerGrid,
}

/// Locate every source pixel corner in destination pixel space.
///
/// # Arguments
/// * `src_shape` - Shape of the source image
/// * `dst_shape` - Shape of the destination image
/// * `src` - Projection of the source image
/// * `dst` - Projection of the destination image
///
/// # Errors
/// Errors from either projection are returned unchanged.
pub fn map_corners(
    src_shape: GridShape,
    dst_shape: GridShape,
    src: &dyn Projection,
    dst: &dyn Projection,
) -> Result<CornerMapping, ReprojectError> {
    debug!(
        "Mapping corners of {} source onto {} destination ({} -> {})",
        src_shape,
        dst_shape,
        src.frame(),
        dst.frame()
    );

    let src_pixel = CornerGrid::pixel_edges(src_shape);
    let (lon, lat) = src.pix2world_grid(&src_pixel.x, &src_pixel.y)?;
    let src_world = CornerGrid { x: lon, y: lat };

    let dst_pixel = CornerGrid::pixel_edges(dst_shape);
    let (lon, lat) = dst.pix2world_grid(&dst_pixel.x, &dst_pixel.y)?;
    let dst_world = CornerGrid { x: lon, y: lat };

    let (lon, lat) = convert_grid(&src_world.x, &src_world.y, src.frame(), dst.frame())?;
    let src_world_in_dst_frame = CornerGrid { x: lon, y: lat };

    let (x, y) = dst.world2pix_grid(&src_world_in_dst_frame.x, &src_world_in_dst_frame.y)?;
    let src_in_dst_pixel = CornerGrid { x, y };

    Ok(CornerMapping {
        src_shape,
        dst_shape,
        src_pixel,
        src_world,
        src_world_in_dst_frame,
        src_in_dst_pixel,
        dst_pixel,
        dst_world,
    })
}
