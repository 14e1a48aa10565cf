use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = state.pipeline.engine();
    let engine_healthy = engine.health_check().await.unwrap_or(false);

    Json(json!({
        "engine": engine.name(),
        "engine_healthy": engine_healthy,
        "sessions": state.sessions.session_count(),
    }))
}
