//! PDFChat RAG - Retrieval-augmented question answering
//!
//! This crate wires the pipeline together:
//! - `DocumentIndexer` turns an uploaded document into a `VectorIndex`
//! - `RetrievalQa` embeds a question, retrieves the top-k chunks and asks the LLM
//! - `ChatSession` keeps the transcript and exportable history
//!
//! How retrieved chunks become a prompt is decided by an `AnswerStrategy`;
//! `StuffStrategy` places all of them into a single prompt.
//!
//! Author: hephaex@gmail.com

use pdfchat_core::{LlmClient, LlmConfig, PdfChatError, RagConfig, Result, ScoredChunk};
use pdfchat_vector::{EmbeddingClient, OpenAiEmbedding, VectorIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub mod history;
pub mod indexer;
pub mod llm;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use history::{history_filename, load_history, write_history};
pub use indexer::{DocumentIndexer, LoadedDocument};
pub use llm::OpenAiClient;
pub use session::ChatSession;

// ============================================================================
// Answer Strategies
// ============================================================================

/// Prompt used by `StuffStrategy` unless overridden
pub const DEFAULT_STUFF_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n{context}\n\nQuestion: {question}\nHelpful Answer:";

/// Separator between chunks in the stuffed context
const CONTEXT_SEPARATOR: &str = "\n\n";

/// Turns a question and its retrieved chunks into an LLM prompt
pub trait AnswerStrategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &str;

    /// Build the prompt; `chunks` are in descending score order
    fn build_prompt(&self, question: &str, chunks: &[ScoredChunk]) -> String;
}

/// Stuffs every retrieved chunk into one prompt
#[derive(Debug, Clone)]
pub struct StuffStrategy {
    template: String,
    max_context_chars: Option<usize>,
}

impl StuffStrategy {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_STUFF_TEMPLATE.to_string(),
            max_context_chars: None,
        }
    }

    /// Use a custom template with `{context}` and `{question}` placeholders
    pub fn with_template(mut self, template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in ["{context}", "{question}"] {
            if !template.contains(placeholder) {
                return Err(PdfChatError::ValidationError(format!(
                    "Prompt template is missing the {placeholder} placeholder"
                )));
            }
        }
        self.template = template;
        Ok(self)
    }

    /// Cap the stuffed context; lower-ranked chunks that do not fit are dropped
    pub fn with_max_context_chars(mut self, max: Option<usize>) -> Self {
        self.max_context_chars = max;
        self
    }

    /// Join chunks in rank order, stopping at the first one over budget
    fn context(&self, chunks: &[ScoredChunk]) -> String {
        let mut context = String::new();
        let mut used = 0usize;

        for scored in chunks {
            let separator = if context.is_empty() { 0 } else { CONTEXT_SEPARATOR.len() };
            let cost = separator + scored.chunk.content.chars().count();

            if let Some(max) = self.max_context_chars {
                if used + cost > max {
                    tracing::debug!(
                        chunk = scored.chunk.index,
                        budget = max,
                        "Context budget reached"
                    );
                    break;
                }
            }

            if separator > 0 {
                context.push_str(CONTEXT_SEPARATOR);
            }
            context.push_str(&scored.chunk.content);
            used += cost;
        }
        context
    }
}

impl Default for StuffStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerStrategy for StuffStrategy {
    fn name(&self) -> &str {
        "stuff"
    }

    fn build_prompt(&self, question: &str, chunks: &[ScoredChunk]) -> String {
        render(&self.template, &self.context(chunks), question)
    }
}

/// Substitute `{context}` and `{question}` in one pass.
///
/// Braces inside the substituted values are never expanded again.
fn render(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

// ============================================================================
// Retrieval QA
// ============================================================================

/// Answer produced by `RetrievalQa::ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaAnswer {
    /// Generated answer text
    pub answer: String,

    /// Retrieved chunks the answer was conditioned on
    pub sources: Vec<ScoredChunk>,

    /// Time spent retrieving and generating
    pub processing_time_ms: u64,
}

/// Retrieval QA chain
pub struct RetrievalQa {
    embedder: Arc<dyn EmbeddingClient>,
    llm: Arc<dyn LlmClient>,
    strategy: Arc<dyn AnswerStrategy>,
    top_k: usize,
}

impl RetrievalQa {
    /// Create a chain with the stuff strategy and k=3
    pub fn new(embedder: Arc<dyn EmbeddingClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            embedder,
            llm,
            strategy: Arc::new(StuffStrategy::new()),
            top_k: 3,
        }
    }

    /// Create a chain backed by the OpenAI API.
    ///
    /// Fails with `ConfigError` when no API key is configured.
    pub fn from_config(llm_config: &LlmConfig, rag_config: &RagConfig) -> Result<Self> {
        let embedder = Arc::new(OpenAiEmbedding::from_config(llm_config)?);
        let llm = Arc::new(OpenAiClient::from_config(llm_config)?);
        let strategy =
            StuffStrategy::new().with_max_context_chars(rag_config.max_context_chars);

        Ok(Self::new(embedder, llm)
            .with_strategy(Arc::new(strategy))
            .with_top_k(rag_config.top_k))
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn AnswerStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Number of chunks to retrieve (at least 1)
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embedding client shared with the indexer
    pub fn embedder(&self) -> Arc<dyn EmbeddingClient> {
        Arc::clone(&self.embedder)
    }

    /// Embed the question and return the top-k chunks
    pub async fn retrieve(&self, index: &VectorIndex, question: &str) -> Result<Vec<ScoredChunk>> {
        let query = self.embedder.embed(question).await?;
        index.search(&query, self.top_k)
    }

    /// Answer a question against a document index
    pub async fn ask(&self, index: &VectorIndex, question: &str) -> Result<QaAnswer> {
        let start_time = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(PdfChatError::ValidationError(
                "Question cannot be empty".to_string(),
            ));
        }

        tracing::info!(top_k = self.top_k, "RAG query started");

        let sources = self.retrieve(index, question).await?;
        tracing::debug!(
            retrieved = sources.len(),
            top_score = sources.first().map(|s| s.score),
            "Chunks retrieved"
        );

        let prompt = self.strategy.build_prompt(question, &sources);
        tracing::info!(
            strategy = self.strategy.name(),
            model = self.llm.model(),
            prompt_chars = prompt.chars().count(),
            "Calling LLM"
        );
        let answer = self.llm.generate(&prompt).await?;

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            answer_chars = answer.chars().count(),
            processing_time_ms,
            "RAG query completed"
        );

        Ok(QaAnswer {
            answer,
            sources,
            processing_time_ms,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedding, FailingLlm, KeywordEmbedding, ScriptedLlm};
    use pdfchat_core::{DistanceMetric, TextChunk};
    use pdfchat_parser::RecursiveCharacterSplitter;

    fn scored(index: u32, content: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: TextChunk {
                index,
                content: content.to_string(),
                start_offset: 0,
                end_offset: content.chars().count(),
                overlap: 0,
            },
            score,
        }
    }

    const HANDBOOK: &str = "Vacation policy: employees receive fifteen vacation days per year.\n\n\
        Expense policy: receipts are required for every expense report.\n\n\
        Security policy: badges must be worn inside the office at all times.\n\n\
        Parking policy: visitors park in the north lot near the lobby.\n\n\
        Remote policy: remote work requires manager approval each quarter.";

    async fn handbook_index(embedder: Arc<dyn EmbeddingClient>) -> VectorIndex {
        let splitter = RecursiveCharacterSplitter::new(80, 0).unwrap();
        DocumentIndexer::new(splitter, embedder)
            .build_index(HANDBOOK)
            .await
            .unwrap()
    }

    #[test]
    fn test_stuff_prompt_layout() {
        let strategy = StuffStrategy::new();
        let prompt = strategy.build_prompt(
            "How many vacation days?",
            &[scored(0, "Fifteen days.", 0.9), scored(3, "Ask HR.", 0.5)],
        );

        assert!(prompt.starts_with("Use the following pieces of context"));
        assert!(prompt.contains("\n\nFifteen days.\n\nAsk HR.\n\n"));
        assert!(prompt.ends_with("Question: How many vacation days?\nHelpful Answer:"));
    }

    #[test]
    fn test_stuff_prompt_without_chunks() {
        let prompt = StuffStrategy::new().build_prompt("Anything?", &[]);
        assert!(prompt.contains("make up an answer.\n\n\n\nQuestion: Anything?"));
    }

    #[test]
    fn test_context_budget_drops_lowest_ranked() {
        let strategy = StuffStrategy::new().with_max_context_chars(Some(12));
        let prompt = strategy.build_prompt(
            "q",
            &[scored(0, "aaaaa", 0.9), scored(1, "bbbbb", 0.8), scored(2, "c", 0.7)],
        );

        assert!(prompt.contains("aaaaa\n\nbbbbb"));
        assert!(!prompt.contains("\n\nc\n\n"));
    }

    #[test]
    fn test_custom_template() {
        let strategy = StuffStrategy::new()
            .with_template("Q={question} C={context}")
            .unwrap();
        let prompt = strategy.build_prompt("why {context}?", &[scored(0, "because", 1.0)]);
        assert_eq!(prompt, "Q=why {context}? C=because");

        assert!(StuffStrategy::new().with_template("no placeholders").is_err());
    }

    #[test]
    fn test_render_keeps_unknown_braces() {
        assert_eq!(render("{x} {question}", "c", "q"), "{x} q");
    }

    #[tokio::test]
    async fn test_ask_retrieves_top_three_and_answers() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let llm = Arc::new(ScriptedLlm::new("Fifteen days."));
        let index = handbook_index(embedder.clone()).await;
        assert!(index.len() >= 3);

        let qa = RetrievalQa::new(embedder, llm.clone());
        let answer = qa
            .ask(&index, "How many vacation days do employees receive?")
            .await
            .unwrap();

        assert_eq!(answer.answer, "Fifteen days.");
        assert_eq!(answer.sources.len(), 3);
        assert!(answer.sources[0].chunk.content.contains("Vacation policy"));
        assert!(answer
            .sources
            .windows(2)
            .all(|w| w[0].score >= w[1].score));

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Vacation policy"));
        assert!(prompts[0].contains("Question: How many vacation days do employees receive?"));
    }

    #[tokio::test]
    async fn test_ask_with_small_index_returns_all_chunks() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let splitter = RecursiveCharacterSplitter::default();
        let index = DocumentIndexer::new(splitter, embedder.clone())
            .build_index("A single short note.")
            .await
            .unwrap();

        let qa = RetrievalQa::new(embedder, Arc::new(ScriptedLlm::new("ok")));
        let answer = qa.ask(&index, "note?").await.unwrap();
        assert_eq!(answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let llm = Arc::new(ScriptedLlm::new("unused"));
        let qa = RetrievalQa::new(embedder.clone(), llm.clone());

        let err = qa
            .ask(&VectorIndex::new(DistanceMetric::Cosine), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, PdfChatError::ValidationError(_)));
        assert_eq!(embedder.requests(), 0);
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failures_propagate() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let index = handbook_index(embedder.clone()).await;

        let qa = RetrievalQa::new(Arc::new(FailingEmbedding), Arc::new(ScriptedLlm::new("x")));
        let err = qa.ask(&index, "vacation").await.unwrap_err();
        assert!(matches!(err, PdfChatError::EmbeddingError(_)));

        let qa = RetrievalQa::new(embedder, Arc::new(FailingLlm));
        let err = qa.ask(&index, "vacation").await.unwrap_err();
        assert!(matches!(err, PdfChatError::LlmError(_)));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let result = RetrievalQa::from_config(&LlmConfig::default(), &RagConfig::default());
        assert!(matches!(result, Err(PdfChatError::ConfigError(_))));
    }

    #[test]
    fn test_top_k_is_at_least_one() {
        let qa = RetrievalQa::new(
            Arc::new(KeywordEmbedding::default()),
            Arc::new(ScriptedLlm::new("x")),
        )
        .with_top_k(0);
        assert_eq!(qa.top_k(), 1);
    }
}
