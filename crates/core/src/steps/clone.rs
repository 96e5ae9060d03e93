//! Step 1 — voice cloning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::cloner::{CloneRequest, TtsCloner};
use crate::metrics;
use crate::naming;
use crate::pipeline::{PipelineConfig, Step, StepContext, StepError};
use crate::script;

/// Clones every dialogue line in the target speaker's voice.
pub struct CloneStep {
    cloner: Arc<dyn TtsCloner>,
    timeout_secs: u64,
}

impl CloneStep {
    pub fn new(cloner: Arc<dyn TtsCloner>, config: PipelineConfig) -> Self {
        Self {
            cloner,
            timeout_secs: config.clone_timeout_secs,
        }
    }
}

#[async_trait]
impl Step for CloneStep {
    fn number(&self) -> u32 {
        1
    }

    fn name(&self) -> &'static str {
        "Voice Cloning"
    }

    fn needs_gpu(&self) -> bool {
        true
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    async fn run(&self, ctx: &StepContext) -> Result<serde_json::Value, StepError> {
        let mut records = script::load_dialogue(&ctx.inputs.dialogue_json)
            .map_err(|e| StepError::InvalidInput(e.to_string()))?;
        if records.is_empty() {
            return Err(StepError::Empty("empty_dialogue"));
        }

        // Records run in sort order; equal keys keep their original order.
        records.sort_by_key(|r| r.sort);

        let mut sort_counts: HashMap<i64, usize> = HashMap::new();
        for record in &records {
            *sort_counts.entry(record.sort).or_default() += 1;
        }

        let cloned_dir = ctx.cloned_dir();
        std::fs::create_dir_all(&cloned_dir)?;

        let total = records.len();
        let mut success = 0usize;
        let mut failed = 0usize;

        for (index, record) in records.iter().enumerate() {
            if record.text.trim().is_empty() {
                warn!(sort = record.sort, "skipping record with empty text");
                failed += 1;
                metrics::CLONED_LINES.with_label_values(&["failed"]).inc();
                continue;
            }

            let emotion_wav = ctx.inputs.emotion_dir.join(&record.emo_audio);
            if !emotion_wav.is_file() {
                warn!(
                    sort = record.sort,
                    path = %emotion_wav.display(),
                    "skipping record with missing emotion audio"
                );
                failed += 1;
                metrics::CLONED_LINES.with_label_values(&["failed"]).inc();
                continue;
            }

            let dup_index = (sort_counts[&record.sort] > 1).then_some(index);
            let filename = naming::line_filename(record.sort, &record.text, dup_index);
            let output_path = cloned_dir.join(&filename);

            let request = CloneRequest {
                text: record.text.clone(),
                speaker_wav: ctx.inputs.speaker_wav.clone(),
                emotion_wav,
                output_path,
            };

            match self.cloner.clone_with_emotion(request).await {
                Ok(outcome) => {
                    debug!(
                        sort = record.sort,
                        duration_ms = outcome.duration_ms,
                        "line cloned"
                    );
                    success += 1;
                    metrics::CLONED_LINES.with_label_values(&["success"]).inc();
                }
                Err(e) => {
                    warn!(sort = record.sort, error = %e, "line failed to clone");
                    failed += 1;
                    metrics::CLONED_LINES.with_label_values(&["failed"]).inc();
                }
            }
        }

        if success == 0 {
            return Err(StepError::Collaborator(format!(
                "all {} lines failed to clone",
                total
            )));
        }

        Ok(json!({
            "total": total,
            "success": success,
            "failed": failed,
        }))
    }
}
