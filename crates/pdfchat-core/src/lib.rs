//! PDFChat Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout PDFChat:
//! - Chunk and retrieval types
//! - Chat transcript and history records
//! - Common error types
//! - The LLM client trait
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, DistanceMetric, HistoryConfig, LlmConfig, LoggingConfig, RagConfig,
    ServerConfig,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for PDFChat operations
#[derive(Error, Debug)]
pub enum PdfChatError {
    #[error("No document loaded; upload a document first")]
    NoDocumentLoaded,

    #[error("Document contains no extractable text")]
    EmptyDocument,

    #[error("Chat history is empty; nothing to export")]
    EmptyHistory,

    #[error("Unsupported document type: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Index error: {0}")]
    IndexError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for PdfChatError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PdfChatError>;

// ============================================================================
// Chunk Models
// ============================================================================

/// A bounded substring of the extracted document text
///
/// Offsets count Unicode scalar values, not bytes. `overlap` is the number
/// of leading characters this chunk shares with the previous one, so the
/// source text is `chunks[0]` followed by every later chunk minus its
/// first `overlap` characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position within the document, in document order
    pub index: u32,

    /// Text content
    pub content: String,

    /// Starting character offset in the source text
    pub start_offset: usize,

    /// Ending character offset (exclusive)
    pub end_offset: usize,

    /// Characters shared with the previous chunk
    pub overlap: usize,
}

impl TextChunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Content with the overlap prefix removed
    pub fn fresh_content(&self) -> &str {
        match self.content.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.content[byte..],
            None if self.overlap == 0 => &self.content,
            None => "",
        }
    }
}

/// A retrieved chunk with its similarity score (higher is more similar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

// ============================================================================
// Chat Models
// ============================================================================

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the displayed transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Document name recorded when a turn has no loaded document
pub const UNKNOWN_DOCUMENT: &str = "unknown";

/// One exported question/answer turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// User's question
    pub query: String,

    /// Generated answer
    pub response: String,

    /// Name of the document the question was asked against
    pub document: String,

    /// When the answer was produced
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    /// Create a record stamped with the current time
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        document: Option<&str>,
    ) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            document: document.unwrap_or(UNKNOWN_DOCUMENT).to_string(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for chat-completion clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response for a fully built prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name for logging
    fn model(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, start: usize, overlap: usize) -> TextChunk {
        TextChunk {
            index: 0,
            content: content.to_string(),
            start_offset: start,
            end_offset: start + content.chars().count(),
            overlap,
        }
    }

    #[test]
    fn test_fresh_content_strips_overlap() {
        let c = chunk("héllo world", 10, 3);
        assert_eq!(c.fresh_content(), "lo world");
        assert_eq!(c.char_len(), 11);
    }

    #[test]
    fn test_fresh_content_without_overlap() {
        let c = chunk("abc", 0, 0);
        assert_eq!(c.fresh_content(), "abc");
        let empty = chunk("", 0, 0);
        assert_eq!(empty.fresh_content(), "");
    }

    #[test]
    fn test_history_record_defaults_document() {
        let record = HistoryRecord::new("q", "a", None);
        assert_eq!(record.document, UNKNOWN_DOCUMENT);

        let record = HistoryRecord::new("q", "a", Some("manual.pdf"));
        assert_eq!(record.document, "manual.pdf");
    }

    #[test]
    fn test_history_record_json_fields() {
        let record = HistoryRecord::new("Qual é o prazo?", "30 dias", Some("contrato.pdf"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["query"], "Qual é o prazo?");
        assert_eq!(json["response"], "30 dias");
        assert_eq!(json["document"], "contrato.pdf");
        assert!(json["timestamp"].is_string());

        let back: HistoryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_chat_role_serialization() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(ChatRole::User.to_string(), "user");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: PdfChatError = ConfigError::MissingRequired("OPENAI_API_KEY".to_string()).into();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
