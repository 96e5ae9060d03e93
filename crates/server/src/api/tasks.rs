//! Task API handlers.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use storyforge_core::{
    validate_inputs, SchedulerError, StepRecord, Task, TaskError, TaskInputs, TaskStatus,
};

use crate::state::AppState;

/// Maximum allowed limit for task listings
const MAX_LIMIT: usize = 1000;

/// Default limit for task listings
const DEFAULT_LIMIT: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a generation task
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    /// Voice sample of the target speaker
    pub speaker_wav: PathBuf,
    /// Dialogue records to clone
    pub dialogue_json: PathBuf,
    /// Folder of emotional reference clips
    pub emotion_dir: PathBuf,
    /// Original recording used for anchor timing
    pub source_audio: PathBuf,
    /// The story timeline
    pub script_json: PathBuf,
    /// Background music track
    pub bgm: PathBuf,
    /// Optional human label
    pub name: Option<String>,
}

/// Response for an accepted submission
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub task_id: String,
    pub status: String,
    pub created_at: String,
}

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
pub struct ListTasksParams {
    /// Filter by status
    pub status: Option<String>,
    /// Maximum number of tasks to return
    pub limit: Option<usize>,
}

/// Full task view
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: String,
    pub progress: String,
    pub current_step: u32,
    pub total_steps: u32,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_wav: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.task_id,
            name: task.name,
            status: task.status.as_str().to_string(),
            progress: task.progress_message,
            current_step: task.current_step,
            total_steps: task.total_steps,
            steps: task.steps,
            output_wav: task.output_path,
            error: task.error,
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing tasks
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

fn error_json(error: impl Into<String>) -> Json<ApiErrorResponse> {
    Json(ApiErrorResponse {
        error: error.into(),
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a new generation task
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateBody>,
) -> impl IntoResponse {
    let inputs = TaskInputs {
        speaker_wav: body.speaker_wav,
        dialogue_json: body.dialogue_json,
        emotion_dir: body.emotion_dir,
        source_audio: body.source_audio,
        script_json: body.script_json,
        bgm: body.bgm,
    };

    // Reject bad paths and malformed JSON here, not mid-pipeline.
    if let Err(e) = validate_inputs(&inputs) {
        return (StatusCode::BAD_REQUEST, error_json(e.to_string())).into_response();
    }

    let task = match state.registry().create(inputs, body.name) {
        Ok(task) => task,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, error_json(e.to_string()))
                .into_response();
        }
    };

    if let Err(e) = state.scheduler().submit(task.task_id.clone()) {
        // The task never made it onto the queue; drop the record so it
        // does not linger as a phantom pending task.
        let _ = state.registry().delete(&task.task_id);
        return match e {
            SchedulerError::QueueFull { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "5")],
                error_json(e.to_string()),
            )
                .into_response(),
            SchedulerError::Shutdown => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_json(e.to_string())).into_response()
            }
        };
    }

    let response = GenerateResponse {
        task_id: task.task_id,
        status: task.status.as_str().to_string(),
        created_at: task.created_at.to_rfc3339(),
    };
    (StatusCode::ACCEPTED, Json(response)).into_response()
}

/// Get a task by ID
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry().get(&id) {
        Ok(task) => (StatusCode::OK, Json(TaskResponse::from(task))).into_response(),
        Err(TaskError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            error_json(format!("Task not found: {}", id)),
        )
            .into_response(),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, error_json(e.to_string())).into_response()
        }
    }
}

/// List tasks with optional filters
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTasksParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => match TaskStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    error_json(format!("Unknown status filter: {}", raw)),
                )
                    .into_response();
            }
        },
    };

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let total = state.registry().count(status);
    let tasks = state
        .registry()
        .list(status, Some(limit))
        .into_iter()
        .map(TaskResponse::from)
        .collect();

    (StatusCode::OK, Json(ListTasksResponse { tasks, total })).into_response()
}

/// Delete a task and its working directory
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.registry().delete(&id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(TaskError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            error_json(format!("Task not found: {}", id)),
        )
            .into_response(),
        Err(TaskError::Conflict { .. }) => (
            StatusCode::CONFLICT,
            error_json(format!("Task {} is processing", id)),
        )
            .into_response(),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, error_json(e.to_string())).into_response()
        }
    }
}
