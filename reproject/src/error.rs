//! Error types for reprojection requests

use sky_math::GeometryError;
use skyproj::ProjectionError;
use thiserror::Error;

/// Errors surfaced to callers of [`crate::Reprojector::reproject`]
#[derive(Error, Debug)]
pub enum ReprojectError {
    /// Explicit worker count was zero or negative
    #[error("The number of workers to use must be strictly positive, got {0}")]
    InvalidConcurrency(i64),

    /// Only 2-D images and 2-axis projections can be reprojected
    #[error("Only 2-dimensional arrays can be reprojected, got {0} dimensions")]
    UnsupportedDimensionality(usize),

    /// Configuration values outside their allowed range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure inside a projection or frame conversion
    #[error("Projection failed: {0}")]
    Projection(#[from] ProjectionError),

    /// Failure inside the overlap primitive
    #[error("Overlap computation failed: {0}")]
    Geometry(#[from] GeometryError),

    /// The request was cancelled through its [`crate::CancelToken`]
    #[error("Reprojection cancelled")]
    Cancelled,
}

/// Ways a parallel run can fail without the request itself being invalid.
///
/// These never reach the caller: the request is logged and re-run serially.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerFailure {
    #[error("worker for partition {partition} panicked: {message}")]
    Panicked { partition: usize, message: String },

    #[error("worker for partition {partition} failed: {source}")]
    Kernel {
        partition: usize,
        source: GeometryError,
    },

    #[error("could not start worker pool: {0}")]
    PoolBuild(String),

    #[error("worker result channel closed before all partitions reported")]
    Disconnected,
}
