//! Task admission and dispatch.
//!
//! Submissions land on a bounded queue and a fixed pool of workers pulls
//! them off in FIFO order. Each task is owned by exactly one worker from
//! dispatch to terminal state; the HTTP boundary never blocks on
//! pipeline work.

mod config;
mod gate;

pub use config::SchedulerConfig;
pub use gate::GpuGate;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::metrics;
use crate::pipeline::Pipeline;

/// Errors surfaced by task submission.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The bounded submission queue is saturated.
    #[error("Submission queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The worker pool has shut down.
    #[error("Scheduler is not running")]
    Shutdown,
}

/// Dispatches submitted tasks to the worker pool.
pub struct Scheduler {
    submit_tx: mpsc::Sender<String>,
    queue_capacity: usize,
}

impl Scheduler {
    /// Spawn the worker pool and return the submission handle.
    pub fn start(config: SchedulerConfig, pipeline: Arc<Pipeline>) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel::<String>(config.queue_capacity);
        let submit_rx = Arc::new(Mutex::new(submit_rx));

        for worker_id in 0..config.workers {
            let rx = Arc::clone(&submit_rx);
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                info!(worker_id, "pipeline worker started");
                loop {
                    // Hold the receiver lock only for the pop; execution
                    // happens with the queue free for siblings.
                    let task_id = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(task_id) = task_id else {
                        info!(worker_id, "pipeline worker stopping");
                        break;
                    };

                    if let Err(e) = pipeline.run(&task_id).await {
                        error!(worker_id, %task_id, "pipeline run error: {}", e);
                    }
                }
            });
        }

        Self {
            submit_tx,
            queue_capacity: config.queue_capacity,
        }
    }

    /// Enqueue a task for execution. Returns immediately.
    pub fn submit(&self, task_id: String) -> Result<(), SchedulerError> {
        self.submit_tx.try_send(task_id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SchedulerError::QueueFull {
                capacity: self.queue_capacity,
            },
            mpsc::error::TrySendError::Closed(_) => SchedulerError::Shutdown,
        })?;
        metrics::TASKS_SUBMITTED.inc();
        Ok(())
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}
