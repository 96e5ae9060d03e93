//! Slot-to-candidate matching for the sequence builder.
//!
//! Candidates pass through a four-layer funnel: role identity (L1),
//! duration ratio (L1.5), weighted scoring (L2) and decision dispatch (L3).

mod config;
mod embedding;
mod engine;
mod types;

pub use config::MatcherConfig;
pub use embedding::{cosine_similarity, EmbeddingProvider, HashEmbedder};
pub use engine::{SequenceBuilder, SequenceSummary};
pub use types::{Candidate, EntryKind, ScoredCandidate, SequenceEntry, SlotSpec};
