//! RAG query handler
//!
//! Author: hephaex@gmail.com

use super::session_id;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use pdfchat_core::ScoredChunk;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query request body
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// User's question
    pub question: String,
}

/// A retrieved chunk shown alongside the answer
#[derive(Debug, Serialize)]
pub struct SourceChunk {
    /// Chunk position in the document
    pub index: u32,
    pub content: String,
    /// Similarity score
    pub score: f32,
}

impl From<ScoredChunk> for SourceChunk {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            index: scored.chunk.index,
            content: scored.chunk.content,
            score: scored.score,
        }
    }
}

/// Query response body
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,

    /// Retrieved chunks, best first
    pub sources: Vec<SourceChunk>,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Handle RAG query requests
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if req.question.trim().is_empty() {
        return Err(AppError::BadRequest("Question cannot be empty".to_string()));
    }

    let session = state
        .find_session(&session_id(&headers))
        .await
        .ok_or(AppError::NoDocument)?;
    let mut session = session.lock().await;
    let answer = session.ask(&state.qa, &req.question).await?;

    Ok(Json(QueryResponse {
        answer: answer.answer,
        sources: answer.sources.into_iter().map(SourceChunk::from).collect(),
        processing_time_ms: answer.processing_time_ms,
    }))
}
