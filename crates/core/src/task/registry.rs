//! In-memory authoritative task state, fronting a durable store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::store::TaskStore;
use super::types::{StepStatus, Task, TaskError, TaskInputs, TaskStatus};

/// The canonical set of tasks.
///
/// All mutations take the registry-wide write lock and flush through the
/// store before the lock is released, so status transitions are totally
/// ordered and observable after the journal write.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, Task>>,
    store: Arc<dyn TaskStore>,
    tasks_root: PathBuf,
}

impl TaskRegistry {
    /// Load the persisted task set and wrap it.
    pub fn open(store: Arc<dyn TaskStore>, tasks_root: PathBuf) -> Result<Self, TaskError> {
        let tasks = store.load()?;
        if !tasks.is_empty() {
            info!("loaded {} persisted tasks", tasks.len());
        }
        Ok(Self {
            tasks: RwLock::new(tasks),
            store,
            tasks_root,
        })
    }

    /// Working directory for a task.
    pub fn task_dir(&self, task_id: &str) -> PathBuf {
        self.tasks_root.join(task_id)
    }

    pub fn tasks_root(&self) -> &Path {
        &self.tasks_root
    }

    /// Reclassify tasks that were live when the previous process died.
    ///
    /// Only in-process workers own live tasks, so anything restored as
    /// pending or processing was interrupted. Returns how many tasks were
    /// reclassified.
    pub fn recover(&self) -> Result<usize, TaskError> {
        let mut tasks = self.tasks.write().expect("registry lock poisoned");
        let mut recovered = 0;

        for task in tasks.values_mut() {
            if task.status.is_terminal() {
                continue;
            }
            warn!(task_id = %task.task_id, "marking interrupted task as failed");
            task.status = TaskStatus::Failed;
            task.error = Some("interrupted".to_string());
            task.progress_message = "Interrupted by restart".to_string();
            for step in &mut task.steps {
                if step.status == StepStatus::Running {
                    step.status = StepStatus::Failed;
                    step.error = Some("interrupted".to_string());
                    step.finished_at = Some(Utc::now());
                }
            }
            task.updated_at = Utc::now();
            task.finished_at.get_or_insert_with(Utc::now);
            recovered += 1;
        }

        if recovered > 0 {
            self.store.save(&tasks)?;
        }
        Ok(recovered)
    }

    /// Allocate an id and insert a pending task.
    pub fn create(&self, inputs: TaskInputs, name: Option<String>) -> Result<Task, TaskError> {
        let task = Task::new(Uuid::new_v4().to_string(), inputs, name);

        let mut tasks = self.tasks.write().expect("registry lock poisoned");
        tasks.insert(task.task_id.clone(), task.clone());
        self.store.save(&tasks)?;

        info!(task_id = %task.task_id, "task created");
        Ok(task)
    }

    pub fn get(&self, task_id: &str) -> Result<Task, TaskError> {
        let tasks = self.tasks.read().expect("registry lock poisoned");
        tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    /// Newest-first listing with an optional status filter.
    pub fn list(&self, status: Option<TaskStatus>, limit: Option<usize>) -> Vec<Task> {
        let tasks = self.tasks.read().expect("registry lock poisoned");
        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            matching.truncate(limit);
        }
        matching
    }

    /// Number of tasks matching the status filter.
    pub fn count(&self, status: Option<TaskStatus>) -> usize {
        let tasks = self.tasks.read().expect("registry lock poisoned");
        tasks
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .count()
    }

    /// Apply a mutation under the write lock and flush through the store.
    ///
    /// The in-memory mutation is applied before the save, so a failed
    /// save can be retried by re-persisting the same state.
    pub fn update<F>(&self, task_id: &str, mutate: F) -> Result<Task, TaskError>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.write().expect("registry lock poisoned");
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        mutate(task);
        task.updated_at = Utc::now();
        let snapshot = task.clone();
        self.store.save(&tasks)?;
        Ok(snapshot)
    }

    /// Remove a task and its working directory.
    ///
    /// Deleting a task that is currently processing returns
    /// [`TaskError::Conflict`].
    pub fn delete(&self, task_id: &str) -> Result<Task, TaskError> {
        let removed = {
            let mut tasks = self.tasks.write().expect("registry lock poisoned");
            let task = tasks
                .get(task_id)
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
            if task.status == TaskStatus::Processing {
                return Err(TaskError::Conflict {
                    task_id: task_id.to_string(),
                    status: task.status.as_str().to_string(),
                });
            }
            let removed = tasks.remove(task_id).expect("checked above");
            self.store.save(&tasks)?;
            removed
        };

        let dir = self.task_dir(task_id);
        if dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!(task_id, "failed to remove task directory: {}", e);
            }
        }

        info!(task_id, "task deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::json_store::JsonTaskStore;
    use tempfile::TempDir;

    fn inputs() -> TaskInputs {
        TaskInputs {
            speaker_wav: PathBuf::from("/in/speaker.wav"),
            dialogue_json: PathBuf::from("/in/dialogue.json"),
            emotion_dir: PathBuf::from("/in/emotions"),
            source_audio: PathBuf::from("/in/source.wav"),
            script_json: PathBuf::from("/in/script.json"),
            bgm: PathBuf::from("/in/bgm.wav"),
        }
    }

    fn registry(dir: &TempDir) -> TaskRegistry {
        let store = Arc::new(JsonTaskStore::new(dir.path()));
        TaskRegistry::open(store, dir.path().join("tasks")).unwrap()
    }

    #[test]
    fn test_create_then_get() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let created = registry.create(inputs(), Some("demo".to_string())).unwrap();
        let fetched = registry.get(&created.task_id).unwrap();
        assert_eq!(fetched.status, TaskStatus::Pending);
        assert_eq!(fetched.name.as_deref(), Some("demo"));
        assert_eq!(fetched.steps.len(), 4);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        assert!(matches!(
            registry.get("nope"),
            Err(TaskError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_is_newest_first_and_filtered() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let a = registry.create(inputs(), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = registry.create(inputs(), None).unwrap();
        registry
            .update(&a.task_id, |t| t.status = TaskStatus::Completed)
            .unwrap();

        let all = registry.list(None, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].task_id, b.task_id);

        let completed = registry.list(Some(TaskStatus::Completed), None);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].task_id, a.task_id);

        let limited = registry.list(None, Some(1));
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_update_persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let task_id = {
            let registry = registry(&dir);
            let task = registry.create(inputs(), None).unwrap();
            registry
                .update(&task.task_id, |t| {
                    t.status = TaskStatus::Completed;
                    t.progress_message = "done".to_string();
                })
                .unwrap();
            task.task_id
        };

        let reloaded = registry(&dir);
        let task = reloaded.get(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress_message, "done");
    }

    #[test]
    fn test_delete_processing_task_conflicts() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let task = registry.create(inputs(), None).unwrap();
        registry
            .update(&task.task_id, |t| t.status = TaskStatus::Processing)
            .unwrap();

        assert!(matches!(
            registry.delete(&task.task_id),
            Err(TaskError::Conflict { .. })
        ));

        registry
            .update(&task.task_id, |t| t.status = TaskStatus::Completed)
            .unwrap();
        registry.delete(&task.task_id).unwrap();
        assert!(registry.get(&task.task_id).is_err());
    }

    #[test]
    fn test_delete_removes_task_directory() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let task = registry.create(inputs(), None).unwrap();

        let task_dir = registry.task_dir(&task.task_id);
        std::fs::create_dir_all(task_dir.join("1_cloned")).unwrap();
        std::fs::write(task_dir.join("1_cloned/1_hi.wav"), b"x").unwrap();

        registry.delete(&task.task_id).unwrap();
        assert!(!task_dir.exists());
    }

    #[test]
    fn test_recover_marks_live_tasks_interrupted() {
        let dir = TempDir::new().unwrap();
        let (pending_id, processing_id, done_id) = {
            let registry = registry(&dir);
            let pending = registry.create(inputs(), None).unwrap();
            let processing = registry.create(inputs(), None).unwrap();
            let done = registry.create(inputs(), None).unwrap();
            registry
                .update(&processing.task_id, |t| {
                    t.status = TaskStatus::Processing;
                    t.current_step = 1;
                    t.step_mut(1).status = StepStatus::Running;
                })
                .unwrap();
            registry
                .update(&done.task_id, |t| t.status = TaskStatus::Completed)
                .unwrap();
            (pending.task_id, processing.task_id, done.task_id)
        };

        // Simulated restart.
        let registry = registry(&dir);
        let recovered = registry.recover().unwrap();
        assert_eq!(recovered, 2);

        let pending = registry.get(&pending_id).unwrap();
        assert_eq!(pending.status, TaskStatus::Failed);
        assert_eq!(pending.error.as_deref(), Some("interrupted"));

        let processing = registry.get(&processing_id).unwrap();
        assert_eq!(processing.status, TaskStatus::Failed);
        assert_eq!(processing.steps[0].status, StepStatus::Failed);

        let done = registry.get(&done_id).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        // No live tasks remain after recovery.
        assert_eq!(registry.count(Some(TaskStatus::Pending)), 0);
        assert_eq!(registry.count(Some(TaskStatus::Processing)), 0);
    }
}
