//! Result of a reprojection request

use ndarray::{Array2, Zip};

/// Resampled image and its coverage footprint, both destination-shaped.
///
/// Where the footprint is zero no source pixel contributed and the image
/// value is non-finite (`0 / 0`). Callers detect coverage through the
/// footprint rather than through a fill value.
#[derive(Debug, Clone, PartialEq)]
pub struct Reprojection {
    /// Flux-weighted mean of the contributing source pixels
    pub image: Array2<f64>,
    /// Summed coverage fraction, 0 = uncovered, 1 = fully covered
    pub footprint: Array2<f64>,
}

impl Reprojection {
    /// True where at least one source pixel contributed
    pub fn covered_mask(&self) -> Array2<bool> {
        self.footprint.mapv(|w| w > 0.0)
    }

    /// Total flux landing on the destination grid.
    ///
    /// Sums `image * footprint` over covered pixels, which recovers the
    /// accumulated flux sum exactly.
    pub fn total_flux(&self) -> f64 {
        let mut total = 0.0;
        Zip::from(&self.image)
            .and(&self.footprint)
            .for_each(|&value, &weight| {
                if weight > 0.0 {
                    total += value * weight;
                }
            });
        total
    }

    /// Number of destination pixels with non-zero coverage
    pub fn covered_count(&self) -> usize {
        self.footprint.iter().filter(|&&w| w > 0.0).count()
    }

    /// Split into `(image, footprint)`
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>) {
        (self.image, self.footprint)
    }
}
