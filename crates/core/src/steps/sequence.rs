//! Step 3 — timeline assembly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::audio::probe_wav;
use crate::matcher::{Candidate, EmbeddingProvider, MatcherConfig, SequenceBuilder};
use crate::naming;
use crate::pipeline::{PipelineConfig, Step, StepContext, StepError};
use crate::script::{self, DialogueRecord};

/// Turns the trimmed line inventory and the script into a playable
/// sequence, with source-audio anchors as the safety fallback.
pub struct SequenceStep {
    builder: SequenceBuilder,
    timeout_secs: u64,
}

impl SequenceStep {
    pub fn new(
        matcher: MatcherConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            builder: SequenceBuilder::new(matcher, embedder),
            timeout_secs: config.sequence_timeout_secs,
        }
    }

    /// Scan the trimmed directory and join each file with its dialogue
    /// record to recover role and vocal metadata.
    fn collect_candidates(
        &self,
        ctx: &StepContext,
        records: &[DialogueRecord],
    ) -> Result<Vec<Candidate>, StepError> {
        let by_sort: HashMap<i64, &DialogueRecord> =
            records.iter().map(|r| (r.sort, r)).collect();

        let mut files: Vec<_> = std::fs::read_dir(ctx.trimmed_dir())?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
            })
            .collect();
        files.sort_by_key(|e| e.file_name());

        let mut candidates = Vec::new();
        for entry in files {
            let path = entry.path();
            let filename = entry.file_name().to_string_lossy().into_owned();
            let Some(sort) = naming::parse_sort_prefix(&filename) else {
                warn!(file = %filename, "skipping file without sort prefix");
                continue;
            };

            let info = match probe_wav(&path) {
                Ok(info) => info,
                Err(e) => {
                    warn!(file = %filename, error = %e, "skipping unreadable candidate");
                    continue;
                }
            };

            let record = by_sort.get(&sort);
            candidates.push(Candidate {
                index: candidates.len(),
                sort,
                path,
                duration_ms: info.duration_ms,
                role: record.and_then(|r| r.role.clone()),
                vocal_mode: record.and_then(|r| r.vocal_mode.clone()),
                energy_level: record.and_then(|r| r.energy_level),
                pitch_curve: record.and_then(|r| r.pitch_curve.clone()),
                tags: record.map(|r| r.tags.clone()).unwrap_or_default(),
                semantic_desc: record.and_then(|r| r.semantic_desc.clone()),
            });
        }

        Ok(candidates)
    }
}

#[async_trait]
impl Step for SequenceStep {
    fn number(&self) -> u32 {
        3
    }

    fn name(&self) -> &'static str {
        "Build Sequence"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    async fn run(&self, ctx: &StepContext) -> Result<serde_json::Value, StepError> {
        let slots = script::load_slots(&ctx.inputs.script_json)
            .map_err(|e| StepError::InvalidInput(e.to_string()))?;
        let records = script::load_dialogue(&ctx.inputs.dialogue_json)
            .map_err(|e| StepError::InvalidInput(e.to_string()))?;

        let candidates = self.collect_candidates(ctx, &records)?;
        info!(
            slots = slots.len(),
            candidates = candidates.len(),
            "assembling sequence"
        );

        let (entries, summary) =
            self.builder
                .build(&slots, &candidates, &ctx.inputs.source_audio);

        let json_out = serde_json::to_vec_pretty(&entries)
            .map_err(|e| StepError::InvalidInput(format!("serialize sequence: {}", e)))?;
        std::fs::write(ctx.sequence_path(), json_out)?;

        Ok(json!({
            "total_slots": summary.total_slots,
            "cloned": summary.cloned,
            "compensated": summary.compensated,
            "anchors": summary.anchors,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{EntryKind, HashEmbedder, SequenceEntry};
    use crate::task::TaskInputs;
    use crate::testing::{write_dialogue_json, write_script_json, write_test_wav};
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> StepContext {
        let source = dir.path().join("source.wav");
        write_test_wav(&source, 10_000);
        StepContext::new(
            dir.path().join("task"),
            TaskInputs {
                speaker_wav: dir.path().join("speaker.wav"),
                dialogue_json: dir.path().join("dialogue.json"),
                emotion_dir: dir.path().join("emotions"),
                source_audio: source,
                script_json: dir.path().join("script.json"),
                bgm: dir.path().join("bgm.wav"),
            },
        )
    }

    fn step() -> SequenceStep {
        SequenceStep::new(
            MatcherConfig::default(),
            Arc::new(HashEmbedder::default()),
            PipelineConfig::default(),
        )
    }

    fn full_record(sort: i64, text: &str) -> serde_json::Value {
        json!({
            "sort": sort,
            "text": text,
            "emo_audio": "calm.wav",
            "role": "narrator",
            "vocal_mode": "modal_warm",
            "energy_level": 2.0,
            "pitch_curve": "stable",
            "semantic_desc": "calm narration"
        })
    }

    fn full_slot(text: &str, duration_ms: u64, start_ms: u64) -> serde_json::Value {
        json!({
            "expected_text": text,
            "expected_duration_ms": duration_ms,
            "expected_role": "narrator",
            "start_ms": start_ms,
            "vocal_mode": "modal_warm",
            "energy_level": 2.0,
            "pitch_curve": "stable",
            "semantic_desc": "calm narration"
        })
    }

    fn read_entries(ctx: &StepContext) -> Vec<SequenceEntry> {
        let data = std::fs::read(ctx.sequence_path()).unwrap();
        serde_json::from_slice(&data).unwrap()
    }

    #[tokio::test]
    async fn test_matching_candidate_is_placed() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        write_dialogue_json(&ctx.inputs.dialogue_json, &[full_record(1, "hello")]);
        write_script_json(&ctx.inputs.script_json, &[full_slot("hello", 1000, 2000)]);

        std::fs::create_dir_all(ctx.trimmed_dir()).unwrap();
        write_test_wav(&ctx.trimmed_dir().join("1_hello.wav"), 1000);

        let result = step().run(&ctx).await.unwrap();
        assert_eq!(result["total_slots"], 1);
        assert_eq!(result["cloned"], 1);
        assert_eq!(result["anchors"], 0);

        let entries = read_entries(&ctx);
        assert_eq!(entries[0].kind, EntryKind::Cloned);
        assert_eq!(entries[0].start_ms, 2000);
        assert_eq!(entries[0].fade_in_ms, 10);
    }

    #[tokio::test]
    async fn test_extreme_ratio_falls_back_to_anchor() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        write_dialogue_json(&ctx.inputs.dialogue_json, &[full_record(1, "hello")]);
        // Slot expects 5 s but the candidate is 1 s: ratio 5.0 is a hard
        // discard, so the source audio fills the slot.
        write_script_json(&ctx.inputs.script_json, &[full_slot("hello", 5000, 0)]);

        std::fs::create_dir_all(ctx.trimmed_dir()).unwrap();
        write_test_wav(&ctx.trimmed_dir().join("1_hello.wav"), 1000);

        let result = step().run(&ctx).await.unwrap();
        assert_eq!(result["anchors"], 1);

        let entries = read_entries(&ctx);
        assert_eq!(entries[0].kind, EntryKind::Anchor);
        assert_eq!(entries[0].source_path, ctx.inputs.source_audio);
        assert_eq!(entries[0].end_ms, 5000);
    }

    #[tokio::test]
    async fn test_empty_inventory_yields_all_anchor_sequence() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        write_dialogue_json(&ctx.inputs.dialogue_json, &[]);
        write_script_json(
            &ctx.inputs.script_json,
            &[full_slot("a", 1000, 0), full_slot("b", 800, 2000)],
        );
        std::fs::create_dir_all(ctx.trimmed_dir()).unwrap();

        let result = step().run(&ctx).await.unwrap();
        assert_eq!(result["anchors"], 2);
        assert_eq!(result["cloned"], 0);

        let entries = read_entries(&ctx);
        assert!(entries.iter().all(|e| e.kind == EntryKind::Anchor));
    }

    #[tokio::test]
    async fn test_files_without_sort_prefix_are_ignored() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        write_dialogue_json(&ctx.inputs.dialogue_json, &[full_record(1, "hello")]);
        write_script_json(&ctx.inputs.script_json, &[full_slot("hello", 1000, 0)]);

        std::fs::create_dir_all(ctx.trimmed_dir()).unwrap();
        write_test_wav(&ctx.trimmed_dir().join("stray.wav"), 1000);
        write_test_wav(&ctx.trimmed_dir().join("1_hello.wav"), 1000);

        let result = step().run(&ctx).await.unwrap();
        assert_eq!(result["cloned"], 1);
    }
}
