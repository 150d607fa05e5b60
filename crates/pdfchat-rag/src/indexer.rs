//! Document ingestion: extract, split, embed, index
//!
//! Author: hephaex@gmail.com

use pdfchat_core::{DistanceMetric, PdfChatError, RagConfig, Result, TextChunk};
use pdfchat_parser::{Document, ExtractorRegistry, RecursiveCharacterSplitter};
use pdfchat_vector::{EmbeddingClient, VectorIndex};
use std::sync::Arc;
use std::time::Instant;

/// A document that has been extracted and indexed
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Display name of the uploaded file
    pub name: String,

    /// Characters of extracted text
    pub char_count: usize,

    /// Searchable chunks
    pub index: VectorIndex,
}

impl LoadedDocument {
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

/// Builds a fresh `VectorIndex` per uploaded document
pub struct DocumentIndexer {
    extractors: Arc<ExtractorRegistry>,
    splitter: RecursiveCharacterSplitter,
    embedder: Arc<dyn EmbeddingClient>,
    batch_size: usize,
    metric: DistanceMetric,
}

impl DocumentIndexer {
    /// Create an indexer with the default extractors, batch size 100 and cosine similarity
    pub fn new(splitter: RecursiveCharacterSplitter, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            extractors: Arc::new(ExtractorRegistry::with_defaults()),
            splitter,
            embedder,
            batch_size: 100,
            metric: DistanceMetric::Cosine,
        }
    }

    /// Create from config
    pub fn from_config(config: &RagConfig, embedder: Arc<dyn EmbeddingClient>) -> Result<Self> {
        let splitter = RecursiveCharacterSplitter::from_config(config)?;
        Ok(Self::new(splitter, embedder)
            .with_batch_size(config.embedding_batch_size)
            .with_metric(config.distance_metric))
    }

    /// Texts per embedding request (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Use a custom extractor registry
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = Arc::new(extractors);
        self
    }

    pub fn splitter(&self) -> &RecursiveCharacterSplitter {
        &self.splitter
    }

    /// Extract a document's text and index it
    pub async fn ingest(&self, document: Document) -> Result<LoadedDocument> {
        let name = document.name.clone();
        let extractors = Arc::clone(&self.extractors);

        // PDF decoding is CPU-bound; keep it off the async workers
        let text = tokio::task::spawn_blocking(move || extractors.extract(&document))
            .await
            .map_err(|e| PdfChatError::Extraction(format!("extraction task failed: {e}")))??;

        let index = self.build_index(&text).await?;
        tracing::info!(
            document = %name,
            chunks = index.len(),
            "Document indexed"
        );

        Ok(LoadedDocument {
            name,
            char_count: text.chars().count(),
            index,
        })
    }

    /// Split text, embed every chunk and build the index.
    ///
    /// Any embedding failure aborts the whole build; nothing is retried.
    pub async fn build_index(&self, text: &str) -> Result<VectorIndex> {
        let start = Instant::now();
        // pages without a text layer extract as bare whitespace
        if text.trim().is_empty() {
            return Err(PdfChatError::EmptyDocument);
        }

        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            return Err(PdfChatError::EmptyDocument);
        }

        tracing::info!(
            chunks = chunks.len(),
            batch_size = self.batch_size,
            model = self.embedder.model(),
            "Embedding chunks"
        );

        let mut index = VectorIndex::new(self.metric);
        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let vectors = self.embed_batch(batch).await?;
            tracing::debug!(batch = batch_no, size = batch.len(), "Embedding batch received");

            for (chunk, vector) in batch.iter().cloned().zip(vectors) {
                index.insert(chunk, vector)?;
            }
        }

        tracing::info!(
            chunks = index.len(),
            dimension = ?index.dimension(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Vector index built"
        );
        Ok(index)
    }

    async fn embed_batch(&self, batch: &[TextChunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != texts.len() {
            return Err(PdfChatError::EmbeddingError(format!(
                "Expected {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedding, KeywordEmbedding};
    use async_trait::async_trait;

    fn indexer(embedder: Arc<dyn EmbeddingClient>) -> DocumentIndexer {
        let splitter = RecursiveCharacterSplitter::new(100, 20).unwrap();
        DocumentIndexer::new(splitter, embedder)
    }

    fn long_text() -> String {
        (0..30)
            .map(|i| format!("Paragraph {i} talks about topic number {i}."))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[tokio::test]
    async fn test_build_index_embeds_every_chunk() {
        let embedder = Arc::new(KeywordEmbedding::new(64));
        let indexer = indexer(embedder.clone()).with_batch_size(4);
        let text = long_text();

        let index = indexer.build_index(&text).await.unwrap();
        let expected_chunks = indexer.splitter().split(&text).len();

        assert_eq!(index.len(), expected_chunks);
        assert_eq!(index.dimension(), Some(64));
        assert_eq!(embedder.requests(), expected_chunks.div_ceil(4));

        let indices: Vec<u32> = index.chunks().map(|c| c.index).collect();
        let expected: Vec<u32> = (0..expected_chunks as u32).collect();
        assert_eq!(indices, expected);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let indexer = indexer(Arc::new(KeywordEmbedding::default()));
        let err = indexer.build_index("").await.unwrap_err();
        assert!(matches!(err, PdfChatError::EmptyDocument));

        let err = indexer.build_index(" \n\n \n").await.unwrap_err();
        assert!(matches!(err, PdfChatError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_fatal() {
        let indexer = indexer(Arc::new(FailingEmbedding));
        let err = indexer.build_index(&long_text()).await.unwrap_err();
        assert!(matches!(err, PdfChatError::EmbeddingError(_)));
    }

    struct ShortEmbedding;

    #[async_trait]
    impl EmbeddingClient for ShortEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_is_error() {
        let indexer = indexer(Arc::new(ShortEmbedding));
        let err = indexer.build_index(&long_text()).await.unwrap_err();
        assert!(matches!(err, PdfChatError::EmbeddingError(_)));
    }

    #[tokio::test]
    async fn test_ingest_plain_text_document() {
        let indexer = indexer(Arc::new(KeywordEmbedding::default()));
        let text = long_text();
        let document = Document::new("topics.txt", Some("text/plain"), text.clone().into_bytes()).unwrap();

        let loaded = indexer.ingest(document).await.unwrap();
        assert_eq!(loaded.name, "topics.txt");
        assert_eq!(loaded.char_count, text.chars().count());
        assert!(loaded.chunk_count() > 1);
    }

    #[tokio::test]
    async fn test_ingest_invalid_utf8_is_extraction_error() {
        let indexer = indexer(Arc::new(KeywordEmbedding::default()));
        let document = Document::new("bad.txt", None, vec![0xc3, 0x28]).unwrap();

        let err = indexer.ingest(document).await.unwrap_err();
        assert!(matches!(err, PdfChatError::Extraction(_)));
    }

    #[test]
    fn test_from_config_rejects_bad_overlap() {
        let config = RagConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            ..Default::default()
        };
        let result = DocumentIndexer::from_config(&config, Arc::new(KeywordEmbedding::default()));
        assert!(matches!(result, Err(PdfChatError::ValidationError(_))));
    }
}
