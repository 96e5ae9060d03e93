//! Voice-cloning collaborator.
//!
//! The pipeline talks to TTS through the [`TtsCloner`] trait; the shipped
//! implementation shells out to a helper binary so the model process is
//! isolated from the orchestrator.

mod config;
mod error;
mod subprocess;
mod traits;

pub use config::ClonerConfig;
pub use error::ClonerError;
pub use subprocess::{run_subprocess, SubprocessCloner, SubprocessOutput, SubprocessSpec};
pub use traits::{CloneOutcome, CloneRequest, TtsCloner};
