//! On-disk dialogue and script formats, and submit-time validation.
//!
//! Malformed inputs are rejected at the API boundary rather than failing
//! mid-pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::SlotSpec;
use crate::task::TaskInputs;

/// One dialogue line to clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueRecord {
    /// Ordering key; also the filename prefix of the cloned WAV.
    pub sort: i64,
    pub text: String,
    /// Emotion reference clip, relative to the emotion folder.
    pub emo_audio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocal_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_curve: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_desc: Option<String>,
}

/// Rejections produced by submit-time validation.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{kind} not found: {path}")]
    Missing { kind: &'static str, path: String },

    #[error("{kind} is not valid JSON: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// Load and parse the dialogue JSON.
pub fn load_dialogue(path: &Path) -> Result<Vec<DialogueRecord>, InputError> {
    load_json_array(path, "dialogue JSON")
}

/// Load and parse the script JSON.
pub fn load_slots(path: &Path) -> Result<Vec<SlotSpec>, InputError> {
    load_json_array(path, "script JSON")
}

fn load_json_array<T: serde::de::DeserializeOwned>(
    path: &Path,
    kind: &'static str,
) -> Result<Vec<T>, InputError> {
    let data = std::fs::read(path).map_err(|_| InputError::Missing {
        kind,
        path: path.display().to_string(),
    })?;
    serde_json::from_slice(&data).map_err(|e| InputError::Malformed {
        kind,
        reason: e.to_string(),
    })
}

/// Check the six submitted inputs: every path must exist and both JSON
/// documents must match their schema. An empty dialogue is accepted here
/// and rejected by step 1.
pub fn validate_inputs(inputs: &TaskInputs) -> Result<(), InputError> {
    require_file("speaker WAV", &inputs.speaker_wav)?;
    require_file("source audio", &inputs.source_audio)?;
    require_file("BGM", &inputs.bgm)?;
    if !inputs.emotion_dir.is_dir() {
        return Err(InputError::Missing {
            kind: "emotion audio folder",
            path: inputs.emotion_dir.display().to_string(),
        });
    }
    load_dialogue(&inputs.dialogue_json)?;
    load_slots(&inputs.script_json)?;
    Ok(())
}

fn require_file(kind: &'static str, path: &Path) -> Result<(), InputError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(InputError::Missing {
            kind,
            path: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_dialogue_minimal_fields() {
        let json = r#"[{"sort": 1, "text": "hi", "emo_audio": "calm.wav"}]"#;
        let records: Vec<DialogueRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sort, 1);
        assert!(records[0].role.is_none());
        assert!(records[0].tags.is_empty());
    }

    #[test]
    fn test_dialogue_full_fields() {
        let json = r#"[{
            "sort": 2,
            "text": "run!",
            "emo_audio": "urgent.wav",
            "role": "hero",
            "vocal_mode": "modal_bright",
            "energy_level": 4.0,
            "pitch_curve": "rising",
            "tags": ["breath"],
            "semantic_desc": "urgent warning shout"
        }]"#;
        let records: Vec<DialogueRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].role.as_deref(), Some("hero"));
        assert_eq!(records[0].tags, vec!["breath"]);
    }

    fn write_valid_inputs(dir: &TempDir) -> TaskInputs {
        let file = |name: &str, content: &[u8]| -> PathBuf {
            let path = dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        };
        let emotion_dir = dir.path().join("emotions");
        std::fs::create_dir(&emotion_dir).unwrap();

        TaskInputs {
            speaker_wav: file("speaker.wav", b"RIFF"),
            dialogue_json: file(
                "dialogue.json",
                br#"[{"sort":1,"text":"hi","emo_audio":"a.wav"}]"#,
            ),
            emotion_dir,
            source_audio: file("source.wav", b"RIFF"),
            script_json: file(
                "script.json",
                br#"[{"expected_text":"hi","expected_duration_ms":800,"expected_role":"narrator","start_ms":0}]"#,
            ),
            bgm: file("bgm.wav", b"RIFF"),
        }
    }

    #[test]
    fn test_validate_accepts_complete_inputs() {
        let dir = TempDir::new().unwrap();
        let inputs = write_valid_inputs(&dir);
        assert!(validate_inputs(&inputs).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_speaker() {
        let dir = TempDir::new().unwrap();
        let mut inputs = write_valid_inputs(&dir);
        inputs.speaker_wav = dir.path().join("gone.wav");
        assert!(matches!(
            validate_inputs(&inputs),
            Err(InputError::Missing { kind: "speaker WAV", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_malformed_dialogue() {
        let dir = TempDir::new().unwrap();
        let inputs = write_valid_inputs(&dir);
        std::fs::write(&inputs.dialogue_json, b"{\"not\": \"an array\"}").unwrap();
        assert!(matches!(
            validate_inputs(&inputs),
            Err(InputError::Malformed { kind: "dialogue JSON", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_emotion_dir() {
        let dir = TempDir::new().unwrap();
        let mut inputs = write_valid_inputs(&dir);
        inputs.emotion_dir = dir.path().join("nope");
        assert!(validate_inputs(&inputs).is_err());
    }

    #[test]
    fn test_empty_dialogue_is_accepted_at_submit() {
        let dir = TempDir::new().unwrap();
        let inputs = write_valid_inputs(&dir);
        std::fs::write(&inputs.dialogue_json, b"[]").unwrap();
        assert!(validate_inputs(&inputs).is_ok());
    }
}
