//! Chat history handlers
//!
//! Author: hephaex@gmail.com

use super::session_id;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use pdfchat_core::{ChatMessage, HistoryRecord};
use serde::Serialize;
use std::sync::Arc;

/// Transcript and records of one session
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
    pub records: Vec<HistoryRecord>,
}

/// Export result
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    /// Path of the written file
    pub path: String,
    pub record_count: usize,
}

/// Return the session's transcript and history records
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let Some(session) = state.find_session(&session_id(&headers)).await else {
        return Ok(Json(HistoryResponse {
            messages: Vec::new(),
            records: Vec::new(),
        }));
    };
    let session = session.lock().await;

    Ok(Json(HistoryResponse {
        messages: session.messages().to_vec(),
        records: session.history().to_vec(),
    }))
}

/// Write the session's history into the configured export directory
pub async fn export_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let session = state
        .find_session(&session_id(&headers))
        .await
        .ok_or(AppError::EmptyHistory)?;
    let session = session.lock().await;
    let path = session.export_history(&state.config.history.export_dir)?;

    Ok((
        StatusCode::CREATED,
        Json(ExportResponse {
            path: path.display().to_string(),
            record_count: session.history().len(),
        }),
    ))
}
