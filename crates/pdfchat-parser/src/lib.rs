//! PDFChat Parser - Text extraction and chunking
//!
//! Supports extraction of:
//! - PDF documents
//! - Plain text files (UTF-8)
//!
//! Each extractor implements the `TextExtractor` trait and turns the raw
//! bytes of an uploaded `Document` into one plain-text string. The
//! `splitter` module then cuts that string into overlapping chunks.

use pdfchat_core::PdfChatError;
use std::path::Path;
use thiserror::Error;

pub mod pdf;
pub mod splitter;

pub use pdf::PdfExtractor;
pub use splitter::{RecursiveCharacterSplitter, DEFAULT_SEPARATORS};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during extraction and chunking
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF parsing error
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// Encoding error
    #[error("Text encoding error: {0}")]
    EncodingError(String),

    /// Chunk size/overlap combination is unusable
    #[error("Invalid chunk configuration: {0}")]
    InvalidChunkConfig(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for PdfChatError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::UnsupportedFormat(format) => PdfChatError::UnsupportedFormat(format),
            ParserError::IoError { source, .. } => PdfChatError::Io(source),
            ParserError::InvalidChunkConfig(msg) => PdfChatError::ValidationError(msg),
            other @ (ParserError::PdfError(_) | ParserError::EncodingError(_)) => {
                PdfChatError::Extraction(other.to_string())
            }
        }
    }
}

// ============================================================================
// Document Types
// ============================================================================

/// Document kinds accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Detect kind from a MIME type, ignoring parameters such as `charset`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Detect kind from a file name or path
    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Resolve the kind of an upload.
    ///
    /// A declared MIME type wins; a missing or generic one falls back to
    /// the file name's extension.
    pub fn resolve(mime: Option<&str>, name: &str) -> Result<Self> {
        match mime.map(str::trim) {
            Some(m) if !m.is_empty() && !is_generic_mime(m) => {
                Self::from_mime(m).ok_or_else(|| ParserError::UnsupportedFormat(m.to_string()))
            }
            _ => Self::from_name(name).ok_or_else(|| {
                ParserError::UnsupportedFormat(
                    Path::new(name)
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("none")
                        .to_string(),
                )
            }),
        }
    }

    /// Get MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
        }
    }
}

fn is_generic_mime(mime: &str) -> bool {
    mime.eq_ignore_ascii_case("application/octet-stream")
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::PlainText => write!(f, "text"),
        }
    }
}

/// An uploaded document: raw bytes plus the declared type
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name (usually the original file name)
    pub name: String,

    /// MIME type the document was declared (or resolved) as
    pub mime_type: String,

    /// Resolved kind
    pub kind: DocumentKind,

    /// Raw file content
    pub bytes: Vec<u8>,
}

impl Document {
    /// Create a document from uploaded bytes
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let kind = DocumentKind::resolve(mime, &name)?;
        let mime_type = mime
            .map(str::trim)
            .filter(|m| !m.is_empty() && !is_generic_mime(m))
            .unwrap_or(kind.mime_type())
            .to_string();

        Ok(Self {
            name,
            mime_type,
            kind,
            bytes,
        })
    }

    /// Read a document from disk, detecting its kind from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::new(name, None, bytes)
    }
}

// ============================================================================
// Extractor Trait
// ============================================================================

/// Trait for text extractors
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of a document's bytes
    fn extract(&self, bytes: &[u8]) -> Result<String>;

    /// Get supported document kinds
    fn supported_kinds(&self) -> &[DocumentKind];

    /// Check if this extractor can handle a document kind
    fn can_extract(&self, kind: DocumentKind) -> bool {
        self.supported_kinds().contains(&kind)
    }
}

/// Plain text extractor: strict UTF-8 decoding
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            ParserError::EncodingError(format!(
                "invalid UTF-8 sequence at byte {}",
                e.utf8_error().valid_up_to()
            ))
        })
    }

    fn supported_kinds(&self) -> &[DocumentKind] {
        &[DocumentKind::PlainText]
    }
}

// ============================================================================
// Extractor Registry
// ============================================================================

/// Registry of available extractors
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry with the PDF and plain text extractors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PdfExtractor::new());
        registry.register(PlainTextExtractor);
        registry
    }

    /// Register an extractor
    pub fn register<E: TextExtractor + 'static>(&mut self, extractor: E) {
        self.extractors.push(Box::new(extractor));
    }

    /// Find an extractor for a document kind
    pub fn find_extractor(&self, kind: DocumentKind) -> Option<&dyn TextExtractor> {
        self.extractors
            .iter()
            .find(|e| e.can_extract(kind))
            .map(|e| e.as_ref())
    }

    /// Extract a document's text using the appropriate extractor
    pub fn extract(&self, document: &Document) -> Result<String> {
        let extractor = self
            .find_extractor(document.kind)
            .ok_or_else(|| ParserError::UnsupportedFormat(document.kind.to_string()))?;

        let text = extractor.extract(&document.bytes)?;
        tracing::info!(
            document = %document.name,
            kind = %document.kind,
            bytes = document.bytes.len(),
            chars = text.chars().count(),
            "Text extracted"
        );
        Ok(text)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Extract a document's text with the default extractors
pub fn extract_text(document: &Document) -> Result<String> {
    ExtractorRegistry::with_defaults().extract(document)
}

// ============================================================================
// Tests
// ============================================================================
