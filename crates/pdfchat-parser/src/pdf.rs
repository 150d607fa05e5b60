//! PDF text extraction using pdf-extract
//!
//! Pages are decoded in order and their text concatenated with no
//! separator. Any structural error fails the whole document.

use crate::{DocumentKind, ParserError, Result, TextExtractor};
use std::any::Any;
use std::panic;

/// PDF text extractor
#[derive(Debug, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor
    pub fn new() -> Self {
        Self
    }

    /// Decode every page's text, in page order.
    ///
    /// pdf-extract panics on some structurally broken files (undefined
    /// fonts, pages without resources or a media box); those panics are
    /// reported as `PdfError` like any other decoding failure.
    pub fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|payload| {
                let reason = panic_message(payload.as_ref());
                tracing::warn!(error = %reason, "PDF decoder panicked");
                ParserError::PdfError(format!("malformed PDF: {reason}"))
            })?
            .map_err(|e| ParserError::PdfError(e.to_string()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "decoder panic".to_string()
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let pages = self.extract_pages(bytes)?;
        tracing::debug!(page_count = pages.len(), "PDF pages decoded");
        Ok(pages.concat())
    }

    fn supported_kinds(&self) -> &[DocumentKind] {
        &[DocumentKind::Pdf]
    }
}
