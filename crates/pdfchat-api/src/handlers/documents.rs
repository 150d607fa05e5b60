//! Document upload handler
//!
//! Author: hephaex@gmail.com

use super::session_id;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use pdfchat_parser::Document;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Document upload request
#[derive(Debug, Deserialize)]
pub struct UploadDocumentRequest {
    /// Original file name
    pub name: String,

    /// Declared MIME type; the extension decides when absent
    #[serde(default)]
    pub mime_type: Option<String>,

    /// File content, base64 encoded
    pub content_base64: String,
}

/// Document upload response
#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    pub document_name: String,
    pub char_count: usize,
    pub chunk_count: usize,
}

/// Upload a document and make it the session's active index
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<UploadDocumentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Document name cannot be empty".to_string()));
    }

    let bytes = BASE64_STANDARD
        .decode(req.content_base64.trim())
        .map_err(|e| AppError::BadRequest(format!("content_base64 is not valid base64: {e}")))?;
    let document = Document::new(name, req.mime_type.as_deref(), bytes)?;

    let session_id = session_id(&headers);
    tracing::info!(
        session = %session_id,
        document = %document.name,
        kind = %document.kind,
        bytes = document.bytes.len(),
        "Document upload received"
    );

    let session = state.open_session(&session_id).await?;
    let mut session = session.lock().await;

    // a failed ingest leaves the previous index in place
    let loaded = state.indexer.ingest(document).await?;
    let response = UploadDocumentResponse {
        document_name: loaded.name.clone(),
        char_count: loaded.char_count,
        chunk_count: loaded.chunk_count(),
    };
    session.load(loaded);

    Ok((StatusCode::CREATED, Json(response)))
}
