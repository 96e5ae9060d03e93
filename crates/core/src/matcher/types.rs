//! Data types for the matching funnel and the sequence timeline.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One scripted position in the story timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Text the slot is expected to carry.
    pub expected_text: String,
    /// Duration of the slot in the source recording.
    pub expected_duration_ms: u64,
    /// Role tag the candidate must carry.
    pub expected_role: String,
    /// Timeline position of the slot.
    pub start_ms: u64,
    /// Desired vocal mode, e.g. "modal_warm".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocal_mode: Option<String>,
    /// Desired energy level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<f32>,
    /// Desired pitch curve, e.g. "rising".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_curve: Option<String>,
    /// When true, candidates carrying noise tags are penalized.
    #[serde(default)]
    pub expect_clean: bool,
    /// When true, a "breath" tag is a legitimate feature, not noise.
    #[serde(default)]
    pub expect_breath: bool,
    /// Freeform semantic description for embedding similarity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_desc: Option<String>,
}

/// A cloned line under consideration for a slot.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the candidate inventory; tie-break key.
    pub index: usize,
    /// Sort key parsed from the filename.
    pub sort: i64,
    pub path: PathBuf,
    pub duration_ms: u64,
    pub role: Option<String>,
    pub vocal_mode: Option<String>,
    pub energy_level: Option<f32>,
    pub pitch_curve: Option<String>,
    pub tags: Vec<String>,
    pub semantic_desc: Option<String>,
}

/// A candidate annotated with its funnel verdict.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub index: usize,
    pub total: f32,
    pub breakdown: HashMap<&'static str, f32>,
}

/// Whether a timeline entry plays a cloned line or a source-audio slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Cloned,
    Anchor,
}

/// One renderable entry of the assembled timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub start_ms: u64,
    pub end_ms: u64,
    pub kind: EntryKind,
    pub source_path: PathBuf,
    pub gain_db: f32,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
    /// Set to "compensated" when the align step should apply cross-mode
    /// gain/EQ correction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}
