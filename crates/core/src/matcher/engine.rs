//! The matching funnel and timeline assembly.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::config::MatcherConfig;
use super::embedding::{cosine_similarity, EmbeddingProvider};
use super::types::{Candidate, EntryKind, ScoredCandidate, SequenceEntry, SlotSpec};

/// Counts of the decisions taken across one build.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceSummary {
    pub total_slots: usize,
    pub cloned: usize,
    pub compensated: usize,
    pub anchors: usize,
}

/// Assembles a playable timeline from scripted slots and cloned candidates.
pub struct SequenceBuilder {
    config: MatcherConfig,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SequenceBuilder {
    pub fn new(config: MatcherConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { config, embedder }
    }

    /// Build the sequence, one entry per slot in script order.
    ///
    /// `source_audio` is the original recording used for anchor fallback
    /// slices; an anchor entry's `[start_ms, end_ms)` window addresses the
    /// same window in that recording.
    pub fn build(
        &self,
        slots: &[SlotSpec],
        candidates: &[Candidate],
        source_audio: &Path,
    ) -> (Vec<SequenceEntry>, SequenceSummary) {
        let mut entries = Vec::with_capacity(slots.len());
        let mut summary = SequenceSummary {
            total_slots: slots.len(),
            ..Default::default()
        };

        for slot in slots {
            let entry = self.place_slot(slot, candidates, source_audio, &mut summary);
            entries.push(entry);
        }

        (entries, summary)
    }

    fn place_slot(
        &self,
        slot: &SlotSpec,
        candidates: &[Candidate],
        source_audio: &Path,
        summary: &mut SequenceSummary,
    ) -> SequenceEntry {
        // L1: identity gate on the role tag.
        let by_role: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.role.as_deref() == Some(slot.expected_role.as_str()))
            .collect();

        // L1.5: physical duration constraint.
        let admitted: Vec<(&Candidate, bool)> = by_role
            .iter()
            .filter_map(|c| {
                let penalized = match self.duration_zone(slot, c) {
                    DurationZone::Red => return None,
                    DurationZone::Green => false,
                    DurationZone::Penalty => true,
                };
                Some((*c, penalized))
            })
            .collect();

        if admitted.is_empty() {
            debug!(
                slot_text = %slot.expected_text,
                "no admitted candidate, emitting anchor"
            );
            summary.anchors += 1;
            return self.anchor_entry(slot, source_audio);
        }

        // L2: weighted score over the admitted set.
        let mut scored: Vec<(ScoredCandidate, &Candidate)> = admitted
            .iter()
            .map(|(c, penalized)| (self.score(slot, c, *penalized), *c))
            .collect();

        // Highest score wins; equal scores prefer the earlier candidate.
        scored.sort_by(|(a, _), (b, _)| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        let (best, winner) = &scored[0];

        // L3: decision dispatch.
        if best.total >= self.config.clone_threshold {
            summary.cloned += 1;
            self.cloned_entry(slot, winner, None)
        } else if best.total >= self.config.compensate_threshold {
            summary.compensated += 1;
            self.cloned_entry(slot, winner, Some("compensated".to_string()))
        } else {
            debug!(
                slot_text = %slot.expected_text,
                score = best.total,
                "best score below threshold, emitting anchor"
            );
            summary.anchors += 1;
            self.anchor_entry(slot, source_audio)
        }
    }

    fn duration_zone(&self, slot: &SlotSpec, candidate: &Candidate) -> DurationZone {
        if candidate.duration_ms == 0 {
            return DurationZone::Red;
        }
        let ratio = slot.expected_duration_ms as f32 / candidate.duration_ms as f32;
        let c = &self.config;
        if ratio > c.ratio_red_zone_max || ratio < c.ratio_red_zone_min {
            DurationZone::Red
        } else if ratio >= c.ratio_green_zone_min && ratio <= c.ratio_green_zone_max {
            DurationZone::Green
        } else {
            DurationZone::Penalty
        }
    }

    fn score(&self, slot: &SlotSpec, candidate: &Candidate, penalized: bool) -> ScoredCandidate {
        let c = &self.config;
        let mut breakdown = HashMap::new();

        let vocal = self.score_vocal_mode(slot, candidate);
        breakdown.insert("vocal_mode", vocal);

        let prosody = if self.prosody_consistent(slot, candidate) {
            c.prosody_score
        } else {
            0.0
        };
        breakdown.insert("prosody", prosody);

        let semantic = self.score_semantic(slot, candidate);
        breakdown.insert("semantic", semantic);

        let noise = if self.noise_penalty_applies(slot, candidate) {
            c.noise_penalty
        } else {
            0.0
        };
        breakdown.insert("noise", noise);

        let duration = if penalized { c.duration_penalty } else { 0.0 };
        breakdown.insert("duration", duration);

        ScoredCandidate {
            index: candidate.index,
            total: vocal + prosody + semantic + noise + duration,
            breakdown,
        }
    }

    fn score_vocal_mode(&self, slot: &SlotSpec, candidate: &Candidate) -> f32 {
        let (Some(wanted), Some(have)) = (&slot.vocal_mode, &candidate.vocal_mode) else {
            return 0.0;
        };
        if wanted == have {
            return self.config.vocal_mode_exact;
        }
        let degraded = self
            .config
            .vocal_mode_fallback
            .get(wanted)
            .is_some_and(|modes| modes.contains(have));
        if degraded {
            self.config.vocal_mode_degraded
        } else {
            0.0
        }
    }

    /// Prosody is consistent when both the energy level (within tolerance)
    /// and the pitch curve agree.
    fn prosody_consistent(&self, slot: &SlotSpec, candidate: &Candidate) -> bool {
        let energy_ok = match (slot.energy_level, candidate.energy_level) {
            (Some(want), Some(have)) => {
                (want - have).abs() <= self.config.energy_level_tolerance
            }
            _ => false,
        };
        let pitch_ok = match (&slot.pitch_curve, &candidate.pitch_curve) {
            (Some(want), Some(have)) => want == have,
            _ => false,
        };
        energy_ok && pitch_ok
    }

    fn score_semantic(&self, slot: &SlotSpec, candidate: &Candidate) -> f32 {
        let (Some(want), Some(have)) = (&slot.semantic_desc, &candidate.semantic_desc) else {
            return 0.0;
        };
        let a = self.embedder.embed(want);
        let b = self.embedder.embed(have);
        cosine_similarity(&a, &b) * self.config.semantic_max
    }

    fn noise_penalty_applies(&self, slot: &SlotSpec, candidate: &Candidate) -> bool {
        if !slot.expect_clean {
            return false;
        }
        // A breath tag is a wanted physiological feature when the slot asks
        // for it; it does not count against cleanliness.
        if slot.expect_breath && candidate.tags.iter().any(|t| t == "breath") {
            return false;
        }
        candidate
            .tags
            .iter()
            .any(|t| self.config.noise_tags.contains(t))
    }

    fn cloned_entry(
        &self,
        slot: &SlotSpec,
        winner: &Candidate,
        mode: Option<String>,
    ) -> SequenceEntry {
        SequenceEntry {
            start_ms: slot.start_ms,
            end_ms: slot.start_ms + winner.duration_ms,
            kind: EntryKind::Cloned,
            source_path: winner.path.clone(),
            gain_db: 0.0,
            fade_in_ms: self.config.fade_ms,
            fade_out_ms: self.config.fade_ms,
            mode,
        }
    }

    fn anchor_entry(&self, slot: &SlotSpec, source_audio: &Path) -> SequenceEntry {
        SequenceEntry {
            start_ms: slot.start_ms,
            end_ms: slot.start_ms + slot.expected_duration_ms,
            kind: EntryKind::Anchor,
            source_path: source_audio.to_path_buf(),
            gain_db: 0.0,
            fade_in_ms: self.config.fade_ms,
            fade_out_ms: self.config.fade_ms,
            mode: None,
        }
    }
}

enum DurationZone {
    Green,
    Penalty,
    Red,
}
