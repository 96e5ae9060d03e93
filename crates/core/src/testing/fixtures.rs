//! File fixtures for tests: small WAVs and the two JSON inputs.

use std::path::Path;

use crate::audio::{AudioClip, WavSpec};

const DEFAULT_SPEC: WavSpec = WavSpec {
    sample_rate: 16000,
    channels: 1,
};

/// Write a mono 16 kHz sine-tone WAV of the given length.
pub fn write_test_wav(path: &Path, duration_ms: u64) {
    write_test_wav_spec(path, duration_ms, DEFAULT_SPEC);
}

/// Write a sine-tone WAV with an explicit spec.
pub fn write_test_wav_spec(path: &Path, duration_ms: u64, spec: WavSpec) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    let frames = (spec.sample_rate as u64 * duration_ms / 1000) as usize;
    let mut samples = Vec::with_capacity(frames * spec.channels as usize);
    for i in 0..frames {
        let t = i as f32 / spec.sample_rate as f32;
        let value = (t * 330.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
        for _ in 0..spec.channels {
            samples.push(value);
        }
    }
    AudioClip { samples, spec }
        .write(path)
        .expect("write fixture wav");
}

/// Write a dialogue JSON file from record values.
pub fn write_dialogue_json(path: &Path, records: &[serde_json::Value]) {
    write_json_array(path, records);
}

/// Write a script JSON file from slot values.
pub fn write_script_json(path: &Path, slots: &[serde_json::Value]) {
    write_json_array(path, slots);
}

fn write_json_array(path: &Path, values: &[serde_json::Value]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    std::fs::write(path, serde_json::to_vec_pretty(values).expect("serialize fixture"))
        .expect("write fixture json");
}
