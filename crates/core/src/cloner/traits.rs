//! Trait definition for the TTS cloning seam.

use std::path::PathBuf;

use async_trait::async_trait;

use super::error::ClonerError;

/// One line to synthesize.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub text: String,
    /// Voice sample of the target speaker.
    pub speaker_wav: PathBuf,
    /// Reference clip carrying the desired emotional prosody.
    pub emotion_wav: PathBuf,
    /// Where the cloned WAV must be written.
    pub output_path: PathBuf,
}

/// Successful clone summary.
#[derive(Debug, Clone, Copy)]
pub struct CloneOutcome {
    pub duration_ms: u64,
}

/// Synthesizes one dialogue line in the target speaker's voice.
///
/// Implementations are owned by the worker process, initialized once and
/// reused across records; they report failure through the error value and
/// never panic across the pipeline boundary.
#[async_trait]
pub trait TtsCloner: Send + Sync {
    /// Name of the implementation, for logs and step records.
    fn name(&self) -> &str;

    /// Synthesize `request.text` into `request.output_path`.
    async fn clone_with_emotion(&self, request: CloneRequest) -> Result<CloneOutcome, ClonerError>;
}
