use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    routes::AppJson,
    message::{ChatMessage, ChatRequest, ChatTurnResponse},
    services::{chatbot::chat_reply_or_fallback, metrics_manager::MetricsData},
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    AppJson(payload): AppJson<ChatRequest>,
) -> Result<Json<ChatTurnResponse>, AppError> {
    let trimmed = payload.message.trim();

    if trimmed.is_empty() {
        state.metrics.record_chat_rejected().await;
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let session_id = match &payload.session_id {
        Some(s) if !s.trim().is_empty() => state.sessions.ensure_session(s.trim()).await,
        _ => state.sessions.create_session().await,
    };

    // An explicit history wins over the stored transcript.
    let history = match payload.history {
        Some(history) => history,
        None => state
            .sessions
            .get_history(&session_id)
            .await
            .unwrap_or_default(),
    };

    let request = ChatRequest {
        session_id: Some(session_id.clone()),
        message: trimmed.to_string(),
        history: Some(history),
    };
    let outcome = chat_reply_or_fallback(state.model.as_ref(), &request, state.history_policy).await?;

    state
        .sessions
        .append_turn(&session_id, trimmed, outcome.response.text.as_str())
        .await;
    state.metrics.record_chat(outcome.fallback).await;

    tracing::info!(session_id = %session_id, fallback = outcome.fallback, "chat turn completed");

    Ok(Json(ChatTurnResponse {
        session_id,
        text: outcome.response.text,
    }))
}

pub async fn get_transcript_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    state
        .sessions
        .get_history(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Unknown session {session_id}")))
}

pub async fn get_metrics_handler(State(state): State<SharedState>) -> Json<MetricsData> {
    Json(state.metrics.get_metrics().await)
}
