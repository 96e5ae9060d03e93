//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the four-step pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Wall-clock budget for voice cloning.
    #[serde(default = "default_clone_timeout")]
    pub clone_timeout_secs: u64,
    /// Wall-clock budget for silence trimming.
    #[serde(default = "default_trim_timeout")]
    pub trim_timeout_secs: u64,
    /// Wall-clock budget for sequence building.
    #[serde(default = "default_sequence_timeout")]
    pub sequence_timeout_secs: u64,
    /// Wall-clock budget for alignment and mixing.
    #[serde(default = "default_align_timeout")]
    pub align_timeout_secs: u64,

    /// RMS threshold below which a frame counts as silence.
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold_dbfs: f32,
    /// RMS analysis window.
    #[serde(default = "default_frame_ms")]
    pub trim_frame_ms: u64,
    /// Silence kept at each end of a trimmed clip.
    #[serde(default = "default_guard_ms")]
    pub trim_guard_ms: u64,

    /// Attenuation applied to the background music.
    #[serde(default = "default_bgm_gain")]
    pub bgm_gain_db: f32,
    /// Extra gain for entries the matcher marked "compensated".
    #[serde(default = "default_compensation_gain")]
    pub compensation_gain_db: f32,
    /// Final peak ceiling.
    #[serde(default = "default_peak_ceiling")]
    pub peak_ceiling_dbfs: f32,
    /// Silence appended after the last entry.
    #[serde(default = "default_tail_ms")]
    pub tail_ms: u64,
}

fn default_clone_timeout() -> u64 {
    30 * 60
}
fn default_trim_timeout() -> u64 {
    5 * 60
}
fn default_sequence_timeout() -> u64 {
    2 * 60
}
fn default_align_timeout() -> u64 {
    10 * 60
}
fn default_silence_threshold() -> f32 {
    -40.0
}
fn default_frame_ms() -> u64 {
    20
}
fn default_guard_ms() -> u64 {
    50
}
fn default_bgm_gain() -> f32 {
    -12.0
}
fn default_compensation_gain() -> f32 {
    -2.0
}
fn default_peak_ceiling() -> f32 {
    -1.0
}
fn default_tail_ms() -> u64 {
    500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        toml::from_str("").expect("default pipeline config")
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("clone_timeout_secs", self.clone_timeout_secs),
            ("trim_timeout_secs", self.trim_timeout_secs),
            ("sequence_timeout_secs", self.sequence_timeout_secs),
            ("align_timeout_secs", self.align_timeout_secs),
            ("trim_frame_ms", self.trim_frame_ms),
        ] {
            if value == 0 {
                return Err(format!("{} must be positive", name));
            }
        }
        if self.silence_threshold_dbfs >= 0.0 {
            return Err(format!(
                "silence_threshold_dbfs must be negative, got {}",
                self.silence_threshold_dbfs
            ));
        }
        if self.peak_ceiling_dbfs > 0.0 {
            return Err(format!(
                "peak_ceiling_dbfs must not exceed 0 dBFS, got {}",
                self.peak_ceiling_dbfs
            ));
        }
        Ok(())
    }
}
