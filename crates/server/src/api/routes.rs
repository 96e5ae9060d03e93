use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use super::{handlers, tasks};
use crate::metrics;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health, config, metrics
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/config", get(handlers::get_config))
        .route("/api/v1/metrics", get(metrics::render_metrics))
        // Tasks
        .route("/api/generate", post(tasks::generate))
        .route("/api/tasks", get(tasks::list_tasks))
        .route("/api/task/{id}", get(tasks::get_task))
        .route("/api/task/{id}", delete(tasks::delete_task))
        .with_state(state)
}
