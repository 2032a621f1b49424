//! Serial and parallel execution of a reprojection request.
//!
//! A request moves through a fixed sequence:
//!
//! 1. Configuration and input checks, before any coordinate is computed
//! 2. One corner mapping, shared read-only by all workers
//! 3. Either one kernel call over every source column, or one kernel call
//!    per column partition on a dedicated worker pool
//! 4. Merge of the partial accumulators and normalization
//!
//! A failed parallel run is logged and repeated serially. Cancellation is
//! never retried: the orchestrator raises an internal halt flag, waits for
//! every worker to stop, and returns [`ReprojectError::Cancelled`].

use std::any::Any;
use std::fmt;
use std::ops::{Deref, Range};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use ndarray::{Array2, ArrayBase, Data, Dimension, Ix2};
use num_traits::AsPrimitive;
use rayon::{ThreadPool, ThreadPoolBuilder};
use sky_math::{OverlapArea, SphericalPolygonOverlap};
use skyproj::Projection;

use crate::config::{ExecutionStrategy, Parallelism, ReprojectConfig};
use crate::error::{ReprojectError, WorkerFailure};
use crate::hooks::{PartitionEvent, PartitionOutcome, WorkerHooks};
use crate::kernel::{resample_columns, AccumulatorPair, KernelError, KernelInputs};
use crate::mapper::map_corners;
use crate::{GridShape, Reprojection};

/// Split `[0, n_cols)` into `n_parts` contiguous half-open ranges.
///
/// Every range has `n_cols / n_parts` columns except the last, which absorbs
/// the remainder. When `n_parts > n_cols` all ranges but the last are empty.
/// `n_parts == 0` is treated as a single partition.
pub fn partition_columns(n_cols: usize, n_parts: usize) -> Vec<Range<usize>> {
    let n_parts = n_parts.max(1);
    let step = n_cols / n_parts;
    (0..n_parts)
        .map(|i| {
            let start = step * i;
            let end = if i == n_parts - 1 {
                n_cols
            } else {
                step * (i + 1)
            };
            start..end
        })
        .collect()
}

/// Shared cancellation flag for a [`Reprojector`].
///
/// Clones observe the same flag, so one clone can be handed to a signal
/// handler while the request runs. Only the orchestrating thread reads it;
/// workers are stopped through a separate, request-local flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the running (or next) request
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the token can be reused
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    fn as_flag(&self) -> &AtomicBool {
        &self.flag
    }
}

/// Worker pool that lives for one request.
///
/// Dropping it shuts the pool down and blocks until every worker thread has
/// run its exit handler, so no thread outlives the request.
struct ScopedPool {
    pool: Option<ThreadPool>,
    exits: Receiver<usize>,
    threads: usize,
}

impl Deref for ScopedPool {
    type Target = ThreadPool;

    fn deref(&self) -> &ThreadPool {
        // Only taken in drop
        self.pool.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for ScopedPool {
    fn drop(&mut self) {
        drop(self.pool.take());
        let mut exited = 0;
        while exited < self.threads && self.exits.recv().is_ok() {
            exited += 1;
        }
        debug!("Worker pool released ({exited} threads exited)");
    }
}

/// Why a parallel run did not produce accumulators
enum ParallelError {
    Cancelled,
    Failed(WorkerFailure),
}

type PartitionResult = (usize, Result<AccumulatorPair, WorkerFailure>);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Flux-conserving reprojection with configurable execution.
///
/// ```no_run
/// use reproject::{Reprojector, ReprojectConfig};
/// use skyproj::{CelestialFrame, TanProjection};
///
/// let src = TanProjection::from_scale([49.5, 49.5], [83.6, 22.0], 0.001, 0.0, CelestialFrame::Icrs)?;
/// let dst = TanProjection::from_scale([49.5, 49.5], [83.6, 22.0], 0.001, 30.0, CelestialFrame::Icrs)?;
/// let image = ndarray::Array2::<f32>::ones((100, 100));
///
/// let reprojector = Reprojector::new(ReprojectConfig::with_parallelism(4));
/// let result = reprojector.reproject(&image, &src, &dst, (100, 100))?;
/// println!("flux on grid: {}", result.total_flux());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Reprojector {
    config: ReprojectConfig,
    overlap: Arc<dyn OverlapArea>,
    hooks: WorkerHooks,
    cancel: CancelToken,
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Default for Reprojector {
    fn default() -> Self {
        Self::new(ReprojectConfig::default())
    }
}

impl Reprojector {
    pub fn new(config: ReprojectConfig) -> Self {
        Self {
            config,
            overlap: Arc::new(SphericalPolygonOverlap),
            hooks: WorkerHooks::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the overlap primitive
    pub fn with_overlap(mut self, overlap: Arc<dyn OverlapArea>) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_hooks(mut self, hooks: WorkerHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Share an existing cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle to this reprojector's cancellation flag
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ReprojectConfig {
        &self.config
    }

    /// Reproject `image` from the `src` grid onto a `dst` grid of `dst_shape`.
    ///
    /// Any numeric element type is accepted and converted to `f64` first.
    ///
    /// # Errors
    /// * `InvalidConcurrency` / `InvalidConfig` - Before any coordinate is computed
    /// * `UnsupportedDimensionality` - Image or projections are not 2-D
    /// * `Projection` - Propagated unchanged from either projection
    /// * `Geometry` - From the overlap primitive on the serial path
    /// * `Cancelled` - The cancel token was set before or during the run
    pub fn reproject<S, D, A>(
        &self,
        image: &ArrayBase<S, D>,
        src: &dyn Projection,
        dst: &dyn Projection,
        dst_shape: impl Into<GridShape>,
    ) -> Result<Reprojection, ReprojectError>
    where
        S: Data<Elem = A>,
        D: Dimension,
        A: AsPrimitive<f64>,
    {
        let strategy = self.config.validate()?;
        let dst_shape = dst_shape.into();

        let image = image
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| ReprojectError::UnsupportedDimensionality(image.ndim()))?;
        for naxis in [src.naxis(), dst.naxis()] {
            if naxis != 2 {
                return Err(ReprojectError::UnsupportedDimensionality(naxis));
            }
        }
        if self.cancel.is_cancelled() {
            return Err(ReprojectError::Cancelled);
        }

        let image: Array2<f64> = image.mapv(|v| v.as_());
        let src_shape = GridShape::from(image.dim());
        info!("Reprojecting {src_shape} image onto {dst_shape} grid ({strategy:?})");

        let mapping = map_corners(src_shape, dst_shape, src, dst)?;
        let inputs = KernelInputs {
            image: image.view(),
            mapping: &mapping,
            overlap: self.overlap.as_ref(),
        };

        let acc = match strategy {
            ExecutionStrategy::Serial => self.run_serial(&inputs)?,
            ExecutionStrategy::Parallel { workers } => {
                match self.run_parallel(&inputs, workers.resolve()) {
                    Ok(acc) => acc,
                    Err(ParallelError::Cancelled) => return Err(ReprojectError::Cancelled),
                    Err(ParallelError::Failed(failure)) => {
                        warn!("Parallel reprojection failed: {failure}");
                        warn!("Falling back to serial reprojection");
                        self.run_serial(&inputs)?
                    }
                }
            }
        };

        Ok(acc.normalize())
    }

    fn run_serial(&self, inputs: &KernelInputs<'_>) -> Result<AccumulatorPair, ReprojectError> {
        let columns = 0..inputs.mapping.src_shape.cols;
        debug!("Serial resampling of columns {columns:?}");
        resample_columns(columns, inputs, Some(self.cancel.as_flag())).map_err(|e| match e {
            KernelError::Halted => ReprojectError::Cancelled,
            KernelError::Geometry(err) => ReprojectError::Geometry(err),
        })
    }

    fn build_pool(&self, threads: usize) -> Result<ScopedPool, WorkerFailure> {
        let (exit_tx, exit_rx) = crossbeam_channel::unbounded();
        let prefix = self.config.thread_name_prefix.clone();
        let on_start = self.hooks.on_start.clone();

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .start_handler(move |i| {
                if let Some(hook) = &on_start {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(i))) {
                        warn!(
                            "Worker {i} start hook panicked: {}",
                            panic_message(payload.as_ref())
                        );
                    }
                }
            })
            .exit_handler(move |i| {
                let _ = exit_tx.send(i);
            })
            .build()
            .map_err(|e| WorkerFailure::PoolBuild(e.to_string()))?;

        Ok(ScopedPool {
            pool: Some(pool),
            exits: exit_rx,
            threads,
        })
    }

    fn run_parallel(
        &self,
        inputs: &KernelInputs<'_>,
        workers: usize,
    ) -> Result<AccumulatorPair, ParallelError> {
        let cols = inputs.mapping.src_shape.cols;
        // Partitions past the column count would be empty
        let workers = workers.min(cols.max(1));
        let partitions = partition_columns(cols, workers);
        debug!("Dispatching {} partitions: {partitions:?}", partitions.len());

        let pool = self.build_pool(workers).map_err(ParallelError::Failed)?;
        let halt = AtomicBool::new(false);
        let (tx, rx) = crossbeam_channel::unbounded::<PartitionResult>();

        let outcome = pool.in_place_scope(|scope| {
            for (index, columns) in partitions.iter().cloned().enumerate() {
                let tx = tx.clone();
                let halt = &halt;
                let hooks = &self.hooks;
                scope.spawn(move |_| run_partition(index, columns, inputs, halt, hooks, &tx));
            }
            drop(tx);
            self.collect(&rx, partitions.len(), &halt)
        });

        drop(pool);
        let partials = outcome?;

        let mut acc = AccumulatorPair::zeros(inputs.mapping.dst_shape);
        for partial in &partials {
            acc.merge(partial);
        }
        Ok(acc)
    }

    /// Wait for every partition, watching the cancel token between receives.
    ///
    /// Raises `halt` on cancellation or on the first failure. Partials are
    /// returned in partition order.
    fn collect(
        &self,
        rx: &Receiver<PartitionResult>,
        expected: usize,
        halt: &AtomicBool,
    ) -> Result<Vec<AccumulatorPair>, ParallelError> {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let mut partials: Vec<Option<AccumulatorPair>> = vec![None; expected];
        let mut received = 0;

        let stop = |err: ParallelError| {
            halt.store(true, Ordering::SeqCst);
            Err(err)
        };

        while received < expected {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping workers");
                return stop(ParallelError::Cancelled);
            }
            match rx.recv_timeout(poll) {
                Ok((index, Ok(acc))) => {
                    partials[index] = Some(acc);
                    received += 1;
                }
                Ok((_, Err(failure))) => return stop(ParallelError::Failed(failure)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return stop(ParallelError::Failed(WorkerFailure::Disconnected))
                }
            }
        }
        if self.cancel.is_cancelled() {
            return stop(ParallelError::Cancelled);
        }

        Ok(partials.into_iter().flatten().collect())
    }
}

/// Body of one partition job; reports through `tx` unless halted
fn run_partition(
    index: usize,
    columns: Range<usize>,
    inputs: &KernelInputs<'_>,
    halt: &AtomicBool,
    hooks: &WorkerHooks,
    tx: &Sender<PartitionResult>,
) {
    let result = catch_unwind(AssertUnwindSafe(|| {
        hooks.partition_event(&PartitionEvent::Started {
            index,
            columns: columns.clone(),
        });
        resample_columns(columns, inputs, Some(halt))
    }));

    let (outcome, report) = match result {
        Ok(Ok(acc)) => (PartitionOutcome::Completed, Some(Ok(acc))),
        Ok(Err(KernelError::Halted)) => (PartitionOutcome::Halted, None),
        Ok(Err(KernelError::Geometry(source))) => (
            PartitionOutcome::Failed,
            Some(Err(WorkerFailure::Kernel {
                partition: index,
                source,
            })),
        ),
        Err(payload) => (
            PartitionOutcome::Failed,
            Some(Err(WorkerFailure::Panicked {
                partition: index,
                message: panic_message(payload.as_ref()),
            })),
        ),
    };

    let finished = PartitionEvent::Finished { index, outcome };
    if catch_unwind(AssertUnwindSafe(|| hooks.partition_event(&finished))).is_err() {
        warn!("Partition {index} finish hook panicked");
    }

    if let Some(report) = report {
        // The orchestrator may already have stopped listening
        let _ = tx.send((index, report));
    }
}

/// Reproject with default settings and the given parallelism.
///
/// `parallelism` accepts `true` (all CPUs), `false` (serial) or a strictly
/// positive worker count.
pub fn reproject<S, D, A>(
    image: &ArrayBase<S, D>,
    src: &dyn Projection,
    dst: &dyn Projection,
    dst_shape: impl Into<GridShape>,
    parallelism: impl Into<Parallelism>,
) -> Result<Reprojection, ReprojectError>
where
    S: Data<Elem = A>,
    D: Dimension,
    A: AsPrimitive<f64>,
{
    Reprojector::new(ReprojectConfig::with_parallelism(parallelism)).reproject(
        image, src, dst, dst_shape,
    )
}
