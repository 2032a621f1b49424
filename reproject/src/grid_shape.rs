//! Image grid dimensions

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a 2-D image grid
///
/// Follows the ndarray row-major convention: rows (y) come first, then
/// columns (x). Source and destination images carry independent shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of rows (pixels along y)
    pub rows: usize,
    /// Number of columns (pixels along x)
    pub cols: usize,
}

impl GridShape {
    /// Create a new GridShape
    pub fn from_rows_cols(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Dimensions of the pixel-edge grid, `(rows + 1, cols + 1)`
    pub fn corner_dims(&self) -> (usize, usize) {
        (self.rows + 1, self.cols + 1)
    }

    /// Zero-filled array with this shape
    pub fn zeros(&self) -> Array2<f64> {
        Array2::zeros((self.rows, self.cols))
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// True if the grid holds no pixels
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Convert to an ndarray shape tuple `(rows, cols)`
    pub fn to_tuple(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

impl From<(usize, usize)> for GridShape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Self::from_rows_cols(rows, cols)
    }
}

impl From<GridShape> for (usize, usize) {
    fn from(shape: GridShape) -> Self {
        shape.to_tuple()
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
