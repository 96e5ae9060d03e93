//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Worker pool and queue sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of pipeline workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bounded submission queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// GPU gate permits.
    #[serde(default = "default_gpu_permits")]
    pub gpu_permits: usize,
}

fn default_workers() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    32
}

fn default_gpu_permits() -> usize {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            gpu_permits: default_gpu_permits(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("scheduler workers must be positive".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("scheduler queue_capacity must be positive".to_string());
        }
        if self.gpu_permits == 0 {
            return Err("scheduler gpu_permits must be positive".to_string());
        }
        Ok(())
    }
}
