//! Callbacks into the parallel worker pool
//!
//! Hooks run on worker threads. They are the only way to observe or
//! influence individual workers; tests use them to inject crashes and to
//! count how many partitions reached a terminal state.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Called once on each worker thread as the pool starts, with the thread index
pub type StartHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Called from inside each partition job
pub type PartitionHook = Arc<dyn Fn(&PartitionEvent) + Send + Sync>;

/// How a partition job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// The kernel covered the whole column range
    Completed,
    /// The orchestrator raised the halt flag before the range was finished
    Halted,
    /// The kernel returned an error or the job panicked
    Failed,
}

/// Progress of a single partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionEvent {
    Started {
        index: usize,
        columns: Range<usize>,
    },
    Finished {
        index: usize,
        outcome: PartitionOutcome,
    },
}

/// Optional per-worker callbacks for a parallel run.
///
/// A panic inside `on_partition` while a partition starts is treated as a
/// crash of that worker. Serial runs do not invoke any hook.
#[derive(Clone, Default)]
pub struct WorkerHooks {
    pub on_start: Option<StartHook>,
    pub on_partition: Option<PartitionHook>,
}

impl WorkerHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-thread initialization hook
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Set the partition progress hook
    pub fn on_partition<F>(mut self, hook: F) -> Self
    where
        F: Fn(&PartitionEvent) + Send + Sync + 'static,
    {
        self.on_partition = Some(Arc::new(hook));
        self
    }

    pub(crate) fn partition_event(&self, event: &PartitionEvent) {
        if let Some(hook) = &self.on_partition {
            hook(event);
        }
    }
}

impl fmt::Debug for WorkerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_partition", &self.on_partition.is_some())
            .finish()
    }
}
