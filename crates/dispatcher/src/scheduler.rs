//! Deferred execution of flush passes

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::error::DispatcherError;

/// A flush pass waiting to run
pub type DeferredTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs deferred work outside the caller's stack
pub trait Scheduler: Send + Sync {
    /// Scheduler name (used for logging)
    fn name(&self) -> &str;

    /// Hand a task over for later execution
    ///
    /// # Errors
    /// Returns an error when the task could not be handed over; the task is
    /// dropped in that case.
    fn defer(&self, task: DeferredTask) -> Result<(), DispatcherError>;
}

/// Runs tasks once the current runtime is idle
///
/// Spawns on the ambient tokio runtime behind a cooperative yield. Without
/// a runtime the task runs on its own thread with a current-thread runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleScheduler;

impl Scheduler for IdleScheduler {
    fn name(&self) -> &str {
        "idle"
    }

    fn defer(&self, task: DeferredTask) -> Result<(), DispatcherError> {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                tokio::task::yield_now().await;
                task.await;
            });
            return Ok(());
        }

        debug!("No ambient runtime, deferring onto a dedicated thread");
        thread::Builder::new()
            .name("relay-flush".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(task),
                    Err(e) => error!(error = %e, "Failed to build flush runtime"),
                }
            })
            .map(|_| ())
            .map_err(|e| DispatcherError::scheduler_unavailable(self.name(), e.to_string()))
    }
}

/// Collects tasks until told to run them
///
/// Test helper: `run_pending` drives everything deferred so far,
/// including tasks deferred while running.
#[derive(Default, Clone)]
pub struct ManualScheduler {
    tasks: Arc<Mutex<Vec<DeferredTask>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks waiting to run
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Run deferred tasks in order until none are left, returns how many ran
    pub async fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch: Vec<DeferredTask> = std::mem::take(&mut *self.tasks.lock());
            if batch.is_empty() {
                return ran;
            }
            for task in batch {
                task.await;
                ran += 1;
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn name(&self) -> &str {
        "manual"
    }

    fn defer(&self, task: DeferredTask) -> Result<(), DispatcherError> {
        self.tasks.lock().push(task);
        Ok(())
    }
}
