//! Overlap-driven flux redistribution over a range of source columns.
//!
//! Each source pixel is projected into destination pixel space, a candidate
//! box of destination pixels is taken around it, and its value is split
//! between those pixels in proportion to the spherical overlap of the two
//! pixel footprints:
//!
//! ```text
//! fraction        = overlap(src_quad, dst_quad) / overlap(dst_quad, dst_quad)
//! flux[dst]      += value * fraction
//! weight[dst]    += fraction
//! ```
//!
//! Flux landing outside the destination grid is dropped. The kernel only
//! reads the shared corner mapping and source image, and writes into its own
//! [`AccumulatorPair`], so disjoint column ranges can run concurrently.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{Array2, ArrayView2, Zip};
use sky_math::{GeometryError, OverlapArea};
use thiserror::Error;

use crate::mapper::CornerMapping;
use crate::{GridShape, Reprojection};

/// Destination-shaped flux and weight sums
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorPair {
    pub flux: Array2<f64>,
    pub weight: Array2<f64>,
}

impl AccumulatorPair {
    /// Zeroed accumulators for a destination grid
    pub fn zeros(shape: GridShape) -> Self {
        Self {
            flux: shape.zeros(),
            weight: shape.zeros(),
        }
    }

    /// Add one source contribution to destination pixel `(row, col)`
    pub fn accumulate(&mut self, row: usize, col: usize, value: f64, fraction: f64) {
        self.flux[[row, col]] += value * fraction;
        self.weight[[row, col]] += fraction;
    }

    /// Elementwise sum of another partition's accumulators into this one
    pub fn merge(&mut self, other: &AccumulatorPair) {
        self.flux += &other.flux;
        self.weight += &other.weight;
    }

    /// Divide flux by weight; pixels with zero weight become non-finite
    pub fn normalize(self) -> Reprojection {
        let mut image = self.flux;
        Zip::from(&mut image)
            .and(&self.weight)
            .for_each(|flux, &weight| *flux /= weight);
        Reprojection {
            image,
            footprint: self.weight,
        }
    }
}

/// Reasons a kernel invocation stops early
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// The halt flag was raised between source pixels
    #[error("resampling halted")]
    Halted,

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Read-only data shared by every kernel invocation of one request
#[derive(Clone, Copy)]
pub struct KernelInputs<'a> {
    /// Source image, already coerced to `f64`
    pub image: ArrayView2<'a, f64>,
    pub mapping: &'a CornerMapping,
    pub overlap: &'a dyn OverlapArea,
}

/// Inclusive range of candidate destination indices along one axis.
///
/// Corner positions are rounded to the nearest pixel index with ties going
/// up (`floor(p + 0.5)`) before the min and max are taken, then clipped to
/// `[0, len - 1]`. Returns `None` when nothing is left after clipping.
fn candidate_range(positions: &[f64; 4], len: usize) -> Option<(usize, usize)> {
    let lo = positions.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = positions.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let lo = ((lo + 0.5).floor() as i64).max(0);
    let hi = ((hi + 0.5).floor() as i64).min(len as i64 - 1);
    if lo > hi {
        return None;
    }
    Some((lo as usize, hi as usize))
}

fn all_finite(lon: &[f64; 4], lat: &[f64; 4]) -> bool {
    lon.iter().chain(lat.iter()).all(|v| v.is_finite())
}

/// Resample the source pixels whose column lies in `columns`.
///
/// All source rows are visited. The result holds only this range's
/// contribution; summing the results of a partition of `[0, cols)` gives the
/// full-image accumulators.
///
/// Source pixels with a corner that has no position in destination pixel
/// space are skipped, as are destination pixels whose footprint has no
/// finite, positive area.
///
/// # Arguments
/// * `columns` - Half-open source column range
/// * `inputs` - Shared image, corner mapping and overlap primitive
/// * `halt` - Checked before each source pixel; when set the call returns `Halted`
pub fn resample_columns(
    columns: Range<usize>,
    inputs: &KernelInputs<'_>,
    halt: Option<&AtomicBool>,
) -> Result<AccumulatorPair, KernelError> {
    let mapping = inputs.mapping;
    let dst_shape = mapping.dst_shape;
    let mut acc = AccumulatorPair::zeros(dst_shape);

    for col in columns {
        for row in 0..mapping.src_shape.rows {
            if halt.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(KernelError::Halted);
            }

            let (px, py) = mapping.src_in_dst_pixel.quad(row, col);
            if !all_finite(&px, &py) {
                continue;
            }

            let Some((x_lo, x_hi)) = candidate_range(&px, dst_shape.cols) else {
                continue;
            };
            let Some((y_lo, y_hi)) = candidate_range(&py, dst_shape.rows) else {
                continue;
            };

            let (src_lon, src_lat) = mapping.src_world_in_dst_frame.quad_radians(row, col);
            if !all_finite(&src_lon, &src_lat) {
                continue;
            }
            let value = inputs.image[[row, col]];

            for dst_col in x_lo..=x_hi {
                for dst_row in y_lo..=y_hi {
                    let (dst_lon, dst_lat) = mapping.dst_world.quad_radians(dst_row, dst_col);
                    if !all_finite(&dst_lon, &dst_lat) {
                        continue;
                    }

                    let own = inputs
                        .overlap
                        .overlap(&dst_lon, &dst_lat, &dst_lon, &dst_lat)?;
                    if !(own.area.is_finite() && own.area > 0.0) {
                        continue;
                    }

                    let shared = inputs
                        .overlap
                        .overlap(&src_lon, &src_lat, &dst_lon, &dst_lat)?;
                    acc.accumulate(dst_row, dst_col, value, shared.area / own.area);
                }
            }
        }
    }

    Ok(acc)
}
