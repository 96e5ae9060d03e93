//! Core task data types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of pipeline steps every task runs through.
pub const TOTAL_STEPS: u32 = 4;

const STEP_NAMES: [&str; TOTAL_STEPS as usize] =
    ["Voice Cloning", "Trim Silence", "Build Sequence", "Alignment"];

/// Display name of a step, 1-based.
pub fn step_name(step_number: u32) -> &'static str {
    STEP_NAMES[(step_number as usize).saturating_sub(1).min(3)]
}

/// Errors surfaced by the registry and store.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    /// The operation is forbidden while the task is being processed.
    #[error("Task {task_id} is {status}; operation not allowed")]
    Conflict { task_id: String, status: String },

    #[error("Task storage error: {0}")]
    Storage(String),
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// State of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// Execution record of one pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_number: u32,
    pub step_name: String,
    pub status: StepStatus,
    /// Step-defined summary, e.g. `{total, success, failed}` for cloning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRecord {
    fn pending(step_number: u32) -> Self {
        Self {
            step_number,
            step_name: step_name(step_number).to_string(),
            status: StepStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Frozen snapshot of the six inputs a task was submitted with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInputs {
    /// Voice sample of the target speaker.
    pub speaker_wav: PathBuf,
    /// Ordered dialogue records to clone.
    pub dialogue_json: PathBuf,
    /// Folder holding emotional reference clips.
    pub emotion_dir: PathBuf,
    /// Original recording used for anchor slices.
    pub source_audio: PathBuf,
    /// The canonical story timeline.
    pub script_json: PathBuf,
    /// Background music track.
    pub bgm: PathBuf,
}

/// One end-to-end synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub inputs: TaskInputs,
    pub status: TaskStatus,
    /// 0 while not started, otherwise the 1-based step being executed.
    pub current_step: u32,
    pub total_steps: u32,
    pub progress_message: String,
    pub steps: Vec<StepRecord>,
    /// Final mixed audio; set only on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// A freshly created pending task with four pending steps.
    pub fn new(task_id: String, inputs: TaskInputs, name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            name,
            inputs,
            status: TaskStatus::Pending,
            current_step: 0,
            total_steps: TOTAL_STEPS,
            progress_message: "Task created, waiting for a worker".to_string(),
            steps: (1..=TOTAL_STEPS).map(StepRecord::pending).collect(),
            output_path: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// Mutable access to a step record, 1-based.
    pub fn step_mut(&mut self, step_number: u32) -> &mut StepRecord {
        &mut self.steps[(step_number - 1) as usize]
    }
}
