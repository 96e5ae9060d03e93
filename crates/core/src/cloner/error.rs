//! Error types for the cloner module.

use thiserror::Error;

/// Errors that can occur while invoking the TTS helper.
#[derive(Debug, Error)]
pub enum ClonerError {
    /// No helper command line was configured.
    #[error("No cloner helper configured")]
    NotConfigured,

    /// The helper process could not be started.
    #[error("Failed to spawn cloner helper: {0}")]
    Spawn(String),

    /// The helper exceeded its wall-clock budget.
    #[error("Cloner helper timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The helper exited with a non-zero status.
    #[error("Cloner helper exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    /// The helper produced stdout that is not the expected JSON.
    #[error("Unreadable cloner helper output: {0}")]
    BadOutput(String),

    /// The helper ran but reported a synthesis failure.
    #[error("Clone rejected: {0}")]
    Rejected(String),
}
