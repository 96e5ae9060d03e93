//! Step 4 — alignment and final mix.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::audio::{self, AudioClip, Canvas};
use crate::matcher::{EntryKind, SequenceEntry};
use crate::pipeline::{PipelineConfig, Step, StepContext, StepError};

/// Renders the sequence onto a silent canvas, lays the BGM under it and
/// writes the final 16-bit PCM WAV.
pub struct AlignStep {
    config: PipelineConfig,
}

impl AlignStep {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    fn load_entry_audio(&self, entry: &SequenceEntry) -> Result<AudioClip, StepError> {
        let clip = AudioClip::read(&entry.source_path)?;
        Ok(match entry.kind {
            EntryKind::Cloned => clip,
            // An anchor's timeline window addresses the same window in the
            // source recording.
            EntryKind::Anchor => audio::slice_ms(&clip, entry.start_ms, entry.end_ms),
        })
    }
}

#[async_trait]
impl Step for AlignStep {
    fn number(&self) -> u32 {
        4
    }

    fn name(&self) -> &'static str {
        "Alignment"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.align_timeout_secs)
    }

    async fn run(&self, ctx: &StepContext) -> Result<serde_json::Value, StepError> {
        let data = std::fs::read(ctx.sequence_path())?;
        let entries: Vec<SequenceEntry> = serde_json::from_slice(&data)
            .map_err(|e| StepError::InvalidInput(format!("sequence JSON: {}", e)))?;
        if entries.is_empty() {
            return Err(StepError::Empty("no_entries"));
        }

        // The canvas matches the BGM's sample rate and channel layout.
        let bgm = AudioClip::read(&ctx.inputs.bgm)?;
        let canvas_ms = entries.iter().map(|e| e.end_ms).max().unwrap_or(0)
            + self.config.tail_ms;
        let mut canvas = Canvas::new(bgm.spec, canvas_ms);

        let mut mixed_entries = 0usize;
        for entry in &entries {
            let mut clip = match self.load_entry_audio(entry) {
                Ok(clip) => clip,
                Err(e) => {
                    warn!(
                        source = %entry.source_path.display(),
                        error = %e,
                        "skipping entry with unreadable source"
                    );
                    continue;
                }
            };

            let mut gain = entry.gain_db;
            if entry.mode.as_deref() == Some("compensated") {
                gain += self.config.compensation_gain_db;
            }
            audio::apply_gain(&mut clip, gain);
            audio::apply_fades(&mut clip, entry.fade_in_ms, entry.fade_out_ms);

            if let Err(e) = canvas.mix_at(&clip, entry.start_ms) {
                warn!(
                    source = %entry.source_path.display(),
                    error = %e,
                    "skipping unmixable entry"
                );
                continue;
            }
            mixed_entries += 1;
        }

        if mixed_entries == 0 {
            return Err(StepError::Collaborator(
                "no sequence entries could be mixed".to_string(),
            ));
        }

        canvas.mix_background(&bgm, self.config.bgm_gain_db)?;
        canvas.normalize_peak(self.config.peak_ceiling_dbfs);
        let peak_dbfs = canvas.peak_dbfs();

        let mix = canvas.into_clip();
        mix.write(&ctx.output_path())?;
        info!(
            entries = mixed_entries,
            duration_ms = mix.duration_ms(),
            "final mix written"
        );

        Ok(json!({
            "mixed_entries": mixed_entries,
            // Bounded precision for the persisted summary.
            "peak_dbfs": (peak_dbfs * 100.0).round() / 100.0,
            "duration_ms": mix.duration_ms(),
        }))
    }
}
