//! Deterministic stand-ins for the remote embedding and chat APIs
//!
//! Enabled for this crate's tests and, through the `test-utils` feature,
//! for integration tests in downstream crates.

use async_trait::async_trait;
use pdfchat_core::{LlmClient, PdfChatError, Result};
use pdfchat_vector::EmbeddingClient;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Bag-of-words embedding: each lowercase word bumps one hashed bucket.
///
/// Texts sharing words end up close under cosine similarity.
pub struct KeywordEmbedding {
    dimension: usize,
    requests: AtomicUsize,
}

impl KeywordEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of batch requests served so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for KeywordEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingClient for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

/// Embedding client whose every call fails
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingClient for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(PdfChatError::EmbeddingError(
            "OpenAI embedding error (429 Too Many Requests): rate limited".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(PdfChatError::EmbeddingError(
            "OpenAI embedding error (429 Too Many Requests): rate limited".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        0
    }

    fn model(&self) -> &str {
        "failing-test"
    }
}

/// LLM that returns a fixed answer and records every prompt
pub struct ScriptedLlm {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(self.answer.clone())
    }

    fn model(&self) -> &str {
        "scripted-test"
    }
}

/// LLM whose every call fails
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(PdfChatError::LlmError(
            "OpenAI error (401 Unauthorized): invalid api key".to_string(),
        ))
    }

    fn model(&self) -> &str {
        "failing-test"
    }
}
