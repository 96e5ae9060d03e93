//! Matcher configuration.
//!
//! Every funnel constant lives here so the weighting table can be tuned
//! from the config file without touching the engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tunable constants for the matching funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Ratio above which a candidate is discarded outright.
    #[serde(default = "default_ratio_red_max")]
    pub ratio_red_zone_max: f32,
    /// Ratio below which a candidate is discarded outright.
    #[serde(default = "default_ratio_red_min")]
    pub ratio_red_zone_min: f32,
    /// Upper bound of the no-penalty ratio zone.
    #[serde(default = "default_ratio_green_max")]
    pub ratio_green_zone_max: f32,
    /// Lower bound of the no-penalty ratio zone.
    #[serde(default = "default_ratio_green_min")]
    pub ratio_green_zone_min: f32,
    /// Score penalty for candidates between the green and red zones.
    #[serde(default = "default_duration_penalty")]
    pub duration_penalty: f32,

    /// Score for an exact vocal-mode match.
    #[serde(default = "default_vocal_exact")]
    pub vocal_mode_exact: f32,
    /// Score for a degraded vocal-mode match (via the fallback map).
    #[serde(default = "default_vocal_degraded")]
    pub vocal_mode_degraded: f32,
    /// Score for consistent prosody (energy + pitch curve).
    #[serde(default = "default_prosody")]
    pub prosody_score: f32,
    /// Maximum score contributed by semantic similarity.
    #[serde(default = "default_semantic_max")]
    pub semantic_max: f32,
    /// Penalty when the slot expects a clean take but the candidate
    /// carries noise tags.
    #[serde(default = "default_noise_penalty")]
    pub noise_penalty: f32,

    /// Minimum score for a direct clone decision.
    #[serde(default = "default_clone_threshold")]
    pub clone_threshold: f32,
    /// Minimum score for a compensated clone decision.
    #[serde(default = "default_compensate_threshold")]
    pub compensate_threshold: f32,

    /// Tolerance when comparing energy levels.
    #[serde(default = "default_energy_tolerance")]
    pub energy_level_tolerance: f32,
    /// Default fade applied to emitted entries.
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,

    /// Acceptable degraded modes per requested vocal mode.
    #[serde(default = "default_vocal_fallback")]
    pub vocal_mode_fallback: HashMap<String, Vec<String>>,
    /// Tags that count as noise for the cleanliness penalty.
    #[serde(default = "default_noise_tags")]
    pub noise_tags: Vec<String>,
}

fn default_ratio_red_max() -> f32 {
    4.0
}
fn default_ratio_red_min() -> f32 {
    0.2
}
fn default_ratio_green_max() -> f32 {
    2.5
}
fn default_ratio_green_min() -> f32 {
    0.4
}
fn default_duration_penalty() -> f32 {
    -50.0
}
fn default_vocal_exact() -> f32 {
    40.0
}
fn default_vocal_degraded() -> f32 {
    20.0
}
fn default_prosody() -> f32 {
    30.0
}
fn default_semantic_max() -> f32 {
    20.0
}
fn default_noise_penalty() -> f32 {
    -30.0
}
fn default_clone_threshold() -> f32 {
    80.0
}
fn default_compensate_threshold() -> f32 {
    60.0
}
fn default_energy_tolerance() -> f32 {
    0.5
}
fn default_fade_ms() -> u64 {
    10
}

fn default_vocal_fallback() -> HashMap<String, Vec<String>> {
    HashMap::from([
        (
            "nasal_squeak".to_string(),
            vec!["modal_bright".to_string(), "modal_warm".to_string()],
        ),
        (
            "fry_creak".to_string(),
            vec!["rough_gravel".to_string(), "modal_warm".to_string()],
        ),
        ("breathy_airy".to_string(), vec!["modal_warm".to_string()]),
        ("hollow".to_string(), vec!["modal_warm".to_string()]),
    ])
}

fn default_noise_tags() -> Vec<String> {
    ["smack_lips", "click", "background_noise", "noise", "plosive"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for MatcherConfig {
    fn default() -> Self {
        toml::from_str("").expect("default matcher config")
    }
}

impl MatcherConfig {
    /// Validate internal consistency of the zones and thresholds.
    pub fn validate(&self) -> Result<(), String> {
        if self.ratio_red_zone_min >= self.ratio_green_zone_min
            || self.ratio_green_zone_min >= self.ratio_green_zone_max
            || self.ratio_green_zone_max >= self.ratio_red_zone_max
        {
            return Err(format!(
                "ratio zones must nest: red_min < green_min < green_max < red_max, got {} {} {} {}",
                self.ratio_red_zone_min,
                self.ratio_green_zone_min,
                self.ratio_green_zone_max,
                self.ratio_red_zone_max
            ));
        }
        if self.compensate_threshold >= self.clone_threshold {
            return Err(format!(
                "compensate_threshold {} must be below clone_threshold {}",
                self.compensate_threshold, self.clone_threshold
            ));
        }
        if self.semantic_max < 0.0 {
            return Err("semantic_max must be non-negative".to_string());
        }
        Ok(())
    }
}
