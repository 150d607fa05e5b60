//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfchat_core::PdfChatError;
use pdfchat_parser::ParserError;
use serde::{Deserialize, Serialize};

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NoDocument,
    EmptyHistory,
    UnsupportedFormat(String),
    ExtractionFailed(String),
    TooManySessions(usize),
    Upstream(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NoDocument | AppError::EmptyHistory => StatusCode::CONFLICT,
            AppError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TooManySessions(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::BadRequest(msg) => ApiError::bad_request(msg),
            AppError::NoDocument => ApiError::new(
                "NO_DOCUMENT",
                "No document loaded; upload a document first",
            ),
            AppError::EmptyHistory => {
                ApiError::new("EMPTY_HISTORY", "Chat history is empty; nothing to export")
            }
            AppError::UnsupportedFormat(kind) => ApiError::new(
                "UNSUPPORTED_FORMAT",
                "Only PDF and plain-text documents are supported",
            )
            .with_details(kind),
            AppError::ExtractionFailed(msg) => {
                ApiError::new("EXTRACTION_FAILED", "Could not extract text from document")
                    .with_details(msg)
            }
            AppError::TooManySessions(limit) => ApiError::new(
                "TOO_MANY_SESSIONS",
                "Session limit reached; reuse an existing session id",
            )
            .with_details(format!("limit {limit}")),
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Upstream service failed");
                ApiError::new("UPSTREAM_ERROR", "Embedding or LLM service failed").with_details(msg)
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ApiError::internal_error().with_details(msg)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<PdfChatError> for AppError {
    fn from(err: PdfChatError) -> Self {
        match err {
            PdfChatError::NoDocumentLoaded => AppError::NoDocument,
            PdfChatError::EmptyHistory => AppError::EmptyHistory,
            PdfChatError::UnsupportedFormat(kind) => AppError::UnsupportedFormat(kind),
            PdfChatError::EmptyDocument => AppError::ExtractionFailed(err.to_string()),
            PdfChatError::Extraction(msg) => AppError::ExtractionFailed(msg),
            PdfChatError::EmbeddingError(_) | PdfChatError::LlmError(_) => {
                AppError::Upstream(err.to_string())
            }
            PdfChatError::ValidationError(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ParserError> for AppError {
    fn from(err: ParserError) -> Self {
        PdfChatError::from(err).into()
    }
}
