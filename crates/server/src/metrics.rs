//! Prometheus registry and the text exposition endpoint.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::warn;

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in storyforge_core::metrics::all_metrics() {
        if let Err(e) = registry.register(metric) {
            warn!("failed to register metric: {}", e);
        }
    }
    registry
});

/// `GET /api/v1/metrics`
pub async fn render_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
