use thiserror::Error;

/// Errors raised while building or evaluating a sky projection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Linear transform matrix is singular (determinant {0})")]
    SingularMatrix(f64),

    #[error("Invalid projection parameter: {0}")]
    InvalidParameter(String),

    #[error("Coordinate grids differ in shape: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),
}
