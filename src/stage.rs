//! Execution stage and task scheduling.
//!
//! A [`Stage`] accepts units of work for background execution; a suspended
//! relay resumes on one. A [`Schedule`] runs deferred callbacks after a
//! delay. [`TokioStage`] implements both on a dedicated Tokio runtime running
//! in background threads.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A background execution context.
///
/// Submissions from different relays carry no ordering guarantee.
pub trait Stage: Send + Sync {
    /// Submit a task for background execution.
    fn execute(&self, task: Task);
}

/// A deferred-callback scheduler.
pub trait Schedule: Send + Sync {
    /// Run `task` after `delay`. The returned [`TimerRef`] can cancel the
    /// timer before it fires.
    fn defer(&self, delay: Duration, task: Task) -> TimerRef;
}

/// Handle to a scheduled timer.
pub struct TimerRef {
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TimerRef {
    /// A reference to no timer at all; cancellation is a no-op.
    ///
    /// For [`Schedule`] implementations that run the task inline or cannot
    /// cancel.
    pub fn noop() -> Self {
        Self { handle: None }
    }

    /// Cancel the timer if it has not fired yet.
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Configuration for a [`TokioStage`].
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Number of worker threads backing the stage.
    pub worker_threads: usize,
    /// Thread name prefix for the stage's workers.
    pub thread_name: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            thread_name: "laneway-stage".to_string(),
        }
    }
}

/// A stage backed by a dedicated multi-threaded Tokio runtime.
pub struct TokioStage {
    runtime: Runtime,
    pending: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl TokioStage {
    /// Create a stage with the default configuration.
    pub fn new() -> std::io::Result<Arc<Self>> {
        Self::with_config(StageConfig::default())
    }

    /// Create a stage with an explicit configuration.
    pub fn with_config(config: StageConfig) -> std::io::Result<Arc<Self>> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name(config.thread_name)
            .enable_all()
            .build()?;
        Ok(Arc::new(Self {
            runtime,
            pending: Mutex::new(Vec::new()),
        }))
    }

    /// Block until every task submitted so far has completed.
    ///
    /// Returns `false` if any task panicked.
    pub fn flush(&self) -> bool {
        let handles: Vec<tokio::task::JoinHandle<()>> = {
            let mut pending = self.pending.lock();
            std::mem::take(&mut *pending)
        };
        let mut all_ok = true;
        for handle in handles {
            if let Err(err) = self.runtime.block_on(handle) {
                log::error!("[TokioStage] task failed during flush: {err}");
                all_ok = false;
            }
        }
        all_ok
    }
}

impl Stage for TokioStage {
    fn execute(&self, task: Task) {
        let handle = self.runtime.spawn(async move {
            task();
        });
        self.pending.lock().push(handle);
    }
}

impl Schedule for TokioStage {
    fn defer(&self, delay: Duration, task: Task) -> TimerRef {
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerRef {
            handle: Some(handle),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
