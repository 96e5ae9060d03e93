//! Step 2 — silence trimming.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::audio::{trim_silence, AudioClip};
use crate::pipeline::{PipelineConfig, Step, StepContext, StepError};

/// Removes leading and trailing silence from every cloned line.
pub struct TrimStep {
    config: PipelineConfig,
}

impl TrimStep {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Step for TrimStep {
    fn number(&self) -> u32 {
        2
    }

    fn name(&self) -> &'static str {
        "Trim Silence"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.trim_timeout_secs)
    }

    async fn run(&self, ctx: &StepContext) -> Result<serde_json::Value, StepError> {
        let cloned_dir = ctx.cloned_dir();
        let trimmed_dir = ctx.trimmed_dir();
        std::fs::create_dir_all(&trimmed_dir)?;

        let mut entries: Vec<_> = std::fs::read_dir(&cloned_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
            })
            .collect();
        entries.sort_by_key(|e| e.file_name());

        let mut processed = 0usize;
        let mut shortened_frames = 0usize;
        let mut untouched = 0usize;

        for entry in entries {
            let input = entry.path();
            let output = trimmed_dir.join(entry.file_name());

            let clip = match AudioClip::read(&input) {
                Ok(clip) => clip,
                Err(e) => {
                    warn!(file = %input.display(), error = %e, "skipping unreadable clip");
                    continue;
                }
            };

            let outcome = trim_silence(
                clip,
                self.config.silence_threshold_dbfs,
                self.config.trim_frame_ms,
                self.config.trim_guard_ms,
            );

            if let Err(e) = outcome.clip.write(&output) {
                warn!(file = %output.display(), error = %e, "skipping unwritable clip");
                continue;
            }

            processed += 1;
            if outcome.untouched {
                untouched += 1;
            } else {
                shortened_frames += outcome.removed_frames;
                debug!(
                    file = %input.display(),
                    removed_frames = outcome.removed_frames,
                    "clip trimmed"
                );
            }
        }

        if processed == 0 {
            return Err(StepError::Collaborator(
                "no clips could be trimmed".to_string(),
            ));
        }

        Ok(json!({
            "processed": processed,
            "shortened_frames": shortened_frames,
            "untouched": untouched,
        }))
    }
}
