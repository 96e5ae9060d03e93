//! The four-step pipeline driver.

mod config;
mod context;
mod runner;

pub use config::PipelineConfig;
pub use context::StepContext;
pub use runner::Pipeline;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioError;

/// Failure of one pipeline step. Terminal for the owning task.
#[derive(Debug, Error)]
pub enum StepError {
    /// A consumed input was malformed or unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An asset named by the inputs does not exist.
    #[error("Missing asset: {0}")]
    MissingAsset(PathBuf),

    /// A collaborator reported failure.
    #[error("{0}")]
    Collaborator(String),

    /// The step exceeded its wall-clock budget.
    #[error("Step timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Nothing to work on; the message is the machine-readable reason.
    #[error("{0}")]
    Empty(&'static str),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uniform contract of the four step executors.
///
/// A step reads from the task directory and its declared inputs, writes
/// its outputs under the task directory, and returns a JSON summary for
/// the step record.
#[async_trait]
pub trait Step: Send + Sync {
    /// 1-based position in the pipeline.
    fn number(&self) -> u32;

    fn name(&self) -> &'static str;

    /// Whether the step must hold the GPU gate while running.
    fn needs_gpu(&self) -> bool {
        false
    }

    /// Wall-clock budget for one run.
    fn timeout(&self) -> Duration;

    async fn run(&self, ctx: &StepContext) -> Result<serde_json::Value, StepError>;
}
