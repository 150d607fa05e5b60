//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use pdfchat_core::{AppConfig, Result};
use pdfchat_rag::{ChatSession, DocumentIndexer, RetrievalQa};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Session used when a request carries no `x-session-id` header
pub const DEFAULT_SESSION_ID: &str = "default";

/// Shared handle to one chat session; the mutex serializes its actions
pub type SessionHandle = Arc<Mutex<ChatSession>>;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Builds an index per uploaded document
    pub indexer: DocumentIndexer,
    /// Question answering chain
    pub qa: RetrievalQa,
    /// Chat sessions keyed by session id
    sessions: RwLock<HashMap<String, SessionHandle>>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create state around prebuilt indexer and QA chain
    pub fn new(config: AppConfig, indexer: DocumentIndexer, qa: RetrievalQa) -> Self {
        Self {
            config,
            indexer,
            qa,
            sessions: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Create state backed by the OpenAI API.
    ///
    /// Fails when no API key is configured.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let qa = RetrievalQa::from_config(&config.llm, &config.rag)?;
        let indexer = DocumentIndexer::from_config(&config.rag, qa.embedder())?;
        Ok(Self::new(config, indexer, qa))
    }

    /// Look up an existing session
    pub async fn find_session(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).map(Arc::clone)
    }

    /// Get a session, creating it on first use.
    ///
    /// Fails with `TooManySessions` when `id` is new and the map already
    /// holds `server.max_sessions` sessions.
    pub async fn open_session(&self, id: &str) -> std::result::Result<SessionHandle, AppError> {
        if let Some(session) = self.find_session(id).await {
            return Ok(session);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(id) {
            return Ok(Arc::clone(session));
        }

        let limit = self.config.server.max_sessions;
        if sessions.len() >= limit {
            tracing::warn!(session = %id, limit, "Session limit reached");
            return Err(AppError::TooManySessions(limit));
        }

        tracing::info!(session = %id, "Chat session created");
        let session = Arc::new(Mutex::new(ChatSession::new(id)));
        sessions.insert(id.to_string(), Arc::clone(&session));
        Ok(session)
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
