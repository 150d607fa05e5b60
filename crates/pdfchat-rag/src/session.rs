//! Per-user chat session state
//!
//! Author: hephaex@gmail.com

use crate::{history, LoadedDocument, QaAnswer, RetrievalQa};
use pdfchat_core::{ChatMessage, HistoryRecord, PdfChatError, Result};
use pdfchat_vector::VectorIndex;
use std::path::{Path, PathBuf};

/// The document currently answering questions
#[derive(Debug, Clone)]
struct ActiveDocument {
    name: String,
    index: VectorIndex,
}

/// One user's document, transcript and history
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    id: String,
    document: Option<ActiveDocument>,
    messages: Vec<ChatMessage>,
    history: Vec<HistoryRecord>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the active index. Transcript and history are kept.
    pub fn load_document(&mut self, name: impl Into<String>, index: VectorIndex) {
        let name = name.into();
        tracing::info!(
            session = %self.id,
            document = %name,
            chunks = index.len(),
            replaced = self.document.is_some(),
            "Document loaded into session"
        );
        self.document = Some(ActiveDocument { name, index });
    }

    /// Load the output of `DocumentIndexer::ingest`
    pub fn load(&mut self, loaded: LoadedDocument) {
        self.load_document(loaded.name, loaded.index);
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.name.as_str())
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.document.as_ref().map(|d| &d.index)
    }

    /// Ask a question against the loaded document.
    ///
    /// The session changes only when an answer is produced.
    pub async fn ask(&mut self, qa: &RetrievalQa, question: &str) -> Result<QaAnswer> {
        if question.trim().is_empty() {
            return Err(PdfChatError::ValidationError(
                "Question cannot be empty".to_string(),
            ));
        }
        let document = self
            .document
            .as_ref()
            .ok_or(PdfChatError::NoDocumentLoaded)?;

        let answer = qa.ask(&document.index, question).await?;
        let record = HistoryRecord::new(question, answer.answer.clone(), Some(document.name.as_str()));

        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::assistant(answer.answer.clone()));
        self.history.push(record);

        Ok(answer)
    }

    /// Displayed transcript, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Exportable question/answer records, oldest first
    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Write the history into `dir`; see `history::write_history`
    pub fn export_history(&self, dir: &Path) -> Result<PathBuf> {
        history::write_history(&self.history, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingLlm, KeywordEmbedding, ScriptedLlm};
    use crate::DocumentIndexer;
    use pdfchat_core::ChatRole;
    use pdfchat_parser::RecursiveCharacterSplitter;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn index_of(embedder: Arc<KeywordEmbedding>, text: &str) -> VectorIndex {
        DocumentIndexer::new(RecursiveCharacterSplitter::default(), embedder)
            .build_index(text)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ask_without_document() {
        let qa = RetrievalQa::new(
            Arc::new(KeywordEmbedding::default()),
            Arc::new(ScriptedLlm::new("x")),
        );
        let mut session = ChatSession::new("s1");

        let err = session.ask(&qa, "anything?").await.unwrap_err();
        assert!(matches!(err, PdfChatError::NoDocumentLoaded));
        assert!(session.messages().is_empty());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_successful_turn_is_recorded() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let qa = RetrievalQa::new(embedder.clone(), Arc::new(ScriptedLlm::new("Blue.")));
        let mut session = ChatSession::new("s1");
        session.load_document("sky.txt", index_of(embedder, "The sky is blue.").await);

        let answer = session.ask(&qa, "What color is the sky?").await.unwrap();
        assert_eq!(answer.answer, "Blue.");

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "What color is the sky?");
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, "Blue.");

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].document, "sky.txt");
        assert_eq!(history[0].response, "Blue.");
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_session_unchanged() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let mut session = ChatSession::new("s1");
        session.load_document("sky.txt", index_of(embedder.clone(), "The sky is blue.").await);

        let qa = RetrievalQa::new(embedder, Arc::new(FailingLlm));
        assert!(session.ask(&qa, "color?").await.is_err());
        assert!(session.ask(&qa, "  ").await.is_err());
        assert!(session.messages().is_empty());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_reload_keeps_history() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let qa = RetrievalQa::new(embedder.clone(), Arc::new(ScriptedLlm::new("ok")));
        let mut session = ChatSession::new("s1");

        session.load_document("a.txt", index_of(embedder.clone(), "First document.").await);
        session.ask(&qa, "first?").await.unwrap();

        session.load_document("b.txt", index_of(embedder, "Second document.").await);
        assert_eq!(session.document_name(), Some("b.txt"));
        session.ask(&qa, "second?").await.unwrap();

        let documents: Vec<&str> = session.history().iter().map(|r| r.document.as_str()).collect();
        assert_eq!(documents, vec!["a.txt", "b.txt"]);
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_export_history() {
        let embedder = Arc::new(KeywordEmbedding::default());
        let qa = RetrievalQa::new(embedder.clone(), Arc::new(ScriptedLlm::new("ok")));
        let mut session = ChatSession::new("s1");
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            session.export_history(dir.path()),
            Err(PdfChatError::EmptyHistory)
        ));

        session.load_document("notes.txt", index_of(embedder, "Some notes here.").await);
        for question in ["one?", "two?", "three?"] {
            session.ask(&qa, question).await.unwrap();
        }

        let path = session.export_history(dir.path()).unwrap();
        let records = history::load_history(&path).unwrap();
        assert_eq!(records, session.history());
    }
}
