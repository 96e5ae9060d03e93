//! Error types for the audio module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or transforming audio.
#[derive(Debug, Error)]
pub enum AudioError {
    /// File could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a RIFF/WAVE container.
    #[error("Invalid WAV file {path}: {reason}")]
    InvalidWav { path: PathBuf, reason: String },

    /// The WAV encoding is not 16-bit integer PCM.
    #[error("Unsupported WAV encoding in {path}: format {format}, {bits} bits")]
    UnsupportedEncoding {
        path: PathBuf,
        format: u16,
        bits: u16,
    },

    /// Channel layouts that cannot be mapped onto each other.
    #[error("Cannot map {from} channels onto {to}")]
    ChannelMismatch { from: u16, to: u16 },
}

impl AudioError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidWav {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
