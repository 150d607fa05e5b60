//! Recursive character splitter
//!
//! Text is first cut into pieces no longer than `chunk_size`, preferring
//! paragraph breaks, then line breaks, then spaces, and finally single
//! characters. Each separator stays attached to the end of the piece before
//! it, so the pieces tile the input exactly.
//!
//! Pieces are then merged greedily into chunks. After a chunk is emitted,
//! pieces are dropped from its front until at most `chunk_overlap`
//! characters remain and the next piece fits; what remains opens the next
//! chunk. Lengths are counted in characters (Unicode scalar values).

use std::collections::VecDeque;

use pdfchat_core::{RagConfig, TextChunk};

use crate::{ParserError, Result};

/// Paragraph, line, word, character
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A contiguous run of the source text
#[derive(Debug, Clone, Copy)]
struct Piece {
    /// Byte range into the source
    start: usize,
    end: usize,
    /// Character offset of `start`
    char_start: usize,
    chars: usize,
}

#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ParserError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ParserError::InvalidChunkConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator preference list.
    ///
    /// Single-character splitting is always the last resort, whether or not
    /// `""` is listed.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into ordered, overlapping chunks
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split_recursive(
            text,
            0,
            text.len(),
            text.chars().count(),
            0,
            &mut pieces,
        );

        let mut char_start = 0;
        for piece in &mut pieces {
            piece.char_start = char_start;
            char_start += piece.chars;
        }

        let chunks = self.merge(text, &pieces);
        tracing::debug!(
            chars = char_start,
            pieces = pieces.len(),
            chunks = chunks.len(),
            "Text split"
        );
        chunks
    }

    fn split_recursive(
        &self,
        text: &str,
        start: usize,
        end: usize,
        chars: usize,
        level: usize,
        out: &mut Vec<Piece>,
    ) {
        if chars <= self.chunk_size {
            out.push(Piece {
                start,
                end,
                char_start: 0,
                chars,
            });
            return;
        }

        let separator = match self.separators.get(level) {
            Some(sep) if !sep.is_empty() => sep.as_str(),
            _ => {
                // Hard cut: one piece per character
                for (offset, ch) in text[start..end].char_indices() {
                    let piece_start = start + offset;
                    out.push(Piece {
                        start: piece_start,
                        end: piece_start + ch.len_utf8(),
                        char_start: 0,
                        chars: 1,
                    });
                }
                return;
            }
        };

        let segment = &text[start..end];
        let mut last = 0;
        let mut parts = Vec::new();
        for (idx, matched) in segment.match_indices(separator) {
            let part_end = idx + matched.len();
            parts.push((last, part_end));
            last = part_end;
        }
        if last < segment.len() {
            parts.push((last, segment.len()));
        }

        for (part_start, part_end) in parts {
            let part_chars = segment[part_start..part_end].chars().count();
            self.split_recursive(
                text,
                start + part_start,
                start + part_end,
                part_chars,
                level + 1,
                out,
            );
        }
    }

    fn merge(&self, text: &str, pieces: &[Piece]) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut total = 0usize;
        let mut previous_end: Option<usize> = None;

        for piece in pieces {
            if total + piece.chars > self.chunk_size {
                if let Some(chunk) = emit(text, &window, chunks.len(), &mut previous_end) {
                    chunks.push(chunk);
                }

                while total > self.chunk_overlap
                    || (total + piece.chars > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(front) => total -= front.chars,
                        None => break,
                    }
                }
            }

            window.push_back(*piece);
            total += piece.chars;
        }

        if let Some(chunk) = emit(text, &window, chunks.len(), &mut previous_end) {
            chunks.push(chunk);
        }

        chunks
    }
}

/// Turn the current window into a chunk; `None` for an empty window
fn emit(
    text: &str,
    window: &VecDeque<Piece>,
    index: usize,
    previous_end: &mut Option<usize>,
) -> Option<TextChunk> {
    let first = window.front()?;
    let last = window.back()?;

    let start_offset = first.char_start;
    let end_offset = last.char_start + last.chars;
    let overlap = previous_end
        .map(|end| end.saturating_sub(start_offset))
        .unwrap_or(0);
    *previous_end = Some(end_offset);

    Some(TextChunk {
        index: index as u32,
        content: text[first.start..last.end].to_string(),
        start_offset,
        end_offset,
        overlap,
    })
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
