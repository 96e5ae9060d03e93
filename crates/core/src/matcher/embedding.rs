//! Sentence embedding seam.
//!
//! The semantic-similarity term of the L2 score is computed against an
//! injected provider so the embedding model can be swapped without
//! touching the engine.

use std::hash::{Hash, Hasher};

/// Produces fixed-dimension sentence vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Dimensionality of the vectors returned by [`embed`](Self::embed).
    fn dimension(&self) -> usize;

    /// Embed a sentence. Returns a vector of [`dimension`](Self::dimension)
    /// length; implementations should unit-normalize.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic bag-of-words hashing embedder.
///
/// Tokens are hashed into a fixed number of buckets and the resulting
/// vector is unit-normalized. No model weights involved, which makes it
/// the offline default and the test workhorse.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity clamped to `0.0..=1.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
