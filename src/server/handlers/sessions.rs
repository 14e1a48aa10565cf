use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.sessions.session_infos().await;
    Json(json!({ "sessions": sessions }))
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.sessions.create();
    Json(json!({ "sessionId": session.id }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    let turns: Vec<Value> = {
        let transcript = session.transcript().await;
        transcript
            .turns()
            .iter()
            .map(|turn| json!({"question": turn.question, "answer": turn.answer}))
            .collect()
    };

    Ok(Json(json!({
        "sessionId": session.id,
        "turns": turns,
    })))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.sessions.remove(&session_id) {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    Ok(Json(json!({ "deleted": session_id })))
}
