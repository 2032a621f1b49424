//! Flux-conserving reprojection of sky images.
//!
//! Resamples a 2-D image from one sky projection onto another by computing
//! the exact overlap of source and destination pixel footprints on the
//! celestial sphere. Total flux is preserved up to what falls outside the
//! destination grid, and a footprint array reports per-pixel coverage.
//!
//! # Components
//!
//! - [`mapper`]: locates every source pixel corner in destination pixel space
//! - [`kernel`]: splits source flux across destination pixels for a column range
//! - [`execution`]: serial or partitioned parallel runs, with cancellation
//!   and serial fallback when a worker fails
//!
//! # Example
//!
//! ```no_run
//! use reproject::reproject;
//! use skyproj::{CelestialFrame, TanProjection};
//!
//! let src = TanProjection::from_scale([31.5, 31.5], [10.68, 41.27], 0.002, 0.0, CelestialFrame::Icrs)?;
//! let dst = TanProjection::from_scale([31.5, 31.5], [121.17, -21.57], 0.002, 0.0, CelestialFrame::Galactic)?;
//! let image = ndarray::Array2::<f64>::zeros((64, 64));
//!
//! let (resampled, footprint) = reproject(&image, &src, &dst, (64, 64), true)?.into_parts();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod grid_shape;
pub mod hooks;
pub mod kernel;
pub mod mapper;
pub mod output;

pub use config::{ExecutionStrategy, Parallelism, ReprojectConfig, WorkerCount};
pub use error::{ReprojectError, WorkerFailure};
pub use execution::{partition_columns, reproject, CancelToken, Reprojector};
pub use grid_shape::GridShape;
pub use hooks::{PartitionEvent, PartitionOutcome, WorkerHooks};
pub use kernel::{resample_columns, AccumulatorPair, KernelInputs};
pub use mapper::{map_corners, CornerGrid, CornerMapping};
pub use output::Reprojection;
