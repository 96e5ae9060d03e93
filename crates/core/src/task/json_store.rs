//! JSON-file implementation of [`TaskStore`].
//!
//! The whole registry is one JSON document. Writes go to a temp file,
//! fsync, then rename over the live journal.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::store::TaskStore;
use super::types::{Task, TaskError};

/// File-backed task journal at `<data_root>/tasks.json`.
pub struct JsonTaskStore {
    path: PathBuf,
}

impl JsonTaskStore {
    pub fn new(data_root: &Path) -> Self {
        Self {
            path: data_root.join("tasks.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for JsonTaskStore {
    fn save(&self, tasks: &HashMap<String, Task>) -> Result<(), TaskError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TaskError::Storage(format!("create {}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_vec_pretty(tasks)
            .map_err(|e| TaskError::Storage(format!("serialize tasks: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = File::create(&tmp)
            .map_err(|e| TaskError::Storage(format!("create {}: {}", tmp.display(), e)))?;
        file.write_all(&json)
            .map_err(|e| TaskError::Storage(format!("write {}: {}", tmp.display(), e)))?;
        file.sync_all()
            .map_err(|e| TaskError::Storage(format!("fsync {}: {}", tmp.display(), e)))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .map_err(|e| TaskError::Storage(format!("rename to {}: {}", self.path.display(), e)))
    }

    fn load(&self) -> Result<HashMap<String, Task>, TaskError> {
        if !self.path.exists() {
            info!("no task journal at {}, starting empty", self.path.display());
            return Ok(HashMap::new());
        }

        let data = fs::read(&self.path)
            .map_err(|e| TaskError::Storage(format!("read {}: {}", self.path.display(), e)))?;

        match serde_json::from_slice(&data) {
            Ok(tasks) => Ok(tasks),
            Err(e) => {
                // Keep the corrupt journal around and start over.
                let backup = self.path.with_extension("json.corrupt");
                warn!(
                    "task journal {} is unreadable ({}); backing up to {}",
                    self.path.display(),
                    e,
                    backup.display()
                );
                if let Err(rename_err) = fs::rename(&self.path, &backup) {
                    warn!("failed to back up corrupt journal: {}", rename_err);
                }
                Ok(HashMap::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::types::TaskInputs;
    use tempfile::TempDir;

    fn sample_task(id: &str) -> Task {
        Task::new(
            id.to_string(),
            TaskInputs {
                speaker_wav: PathBuf::from("/in/speaker.wav"),
                dialogue_json: PathBuf::from("/in/dialogue.json"),
                emotion_dir: PathBuf::from("/in/emotions"),
                source_audio: PathBuf::from("/in/source.wav"),
                script_json: PathBuf::from("/in/script.json"),
                bgm: PathBuf::from("/in/bgm.wav"),
            },
            None,
        )
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonTaskStore::new(dir.path());

        let mut tasks = HashMap::new();
        tasks.insert("a".to_string(), sample_task("a"));
        tasks.insert("b".to_string(), sample_task("b"));
        store.save(&tasks).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["a"].task_id, "a");
        assert_eq!(loaded["a"].steps.len(), 4);
        assert_eq!(loaded["a"].created_at, tasks["a"].created_at);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonTaskStore::new(dir.path());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_journal_is_backed_up() {
        let dir = TempDir::new().unwrap();
        let store = JsonTaskStore::new(dir.path());
        fs::write(store.path(), b"{ not json").unwrap();

        let loaded = store.load().unwrap();
        assert!(loaded.is_empty());
        assert!(dir.path().join("tasks.json.corrupt").exists());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonTaskStore::new(dir.path());
        store.save(&HashMap::new()).unwrap();
        assert!(store.path().exists());
        assert!(!dir.path().join("tasks.json.tmp").exists());
    }
}
