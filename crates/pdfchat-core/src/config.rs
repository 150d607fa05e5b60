//! PDFChat Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development. Environment values always
//! take precedence over file values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// LLM and embedding provider configuration
    pub llm: LlmConfig,

    /// Chunking and retrieval configuration
    pub rag: RagConfig,

    /// Chat history export configuration
    pub history: HistoryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env_override()
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// `with_env_override` passes `std::env::var`; tests pass a map.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(max) = lookup("MAX_SESSIONS") {
            self.server.max_sessions = parse_value("MAX_SESSIONS", max)?;
        }

        // LLM
        if let Some(key) = lookup("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.openai_api_key = Some(key);
            }
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.openai_base_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }
        if let Some(temperature) = lookup("LLM_TEMPERATURE") {
            self.llm.temperature = parse_value("LLM_TEMPERATURE", temperature)?;
        }

        // RAG
        if let Some(size) = lookup("CHUNK_SIZE") {
            self.rag.chunk_size = parse_value("CHUNK_SIZE", size)?;
        }
        if let Some(overlap) = lookup("CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_value("CHUNK_OVERLAP", overlap)?;
        }
        if let Some(top_k) = lookup("RAG_TOP_K") {
            self.rag.top_k = parse_value("RAG_TOP_K", top_k)?;
        }

        // History
        if let Some(dir) = lookup("HISTORY_DIR") {
            self.history.export_dir = PathBuf::from(dir);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(self)
    }

    /// Check required values and cross-field constraints.
    ///
    /// A missing API key is fatal: nothing can be indexed or answered without it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.api_key()?;
        self.rag.validate()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes (uploads are base64 JSON)
    pub max_body_size: usize,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,

    /// Chat sessions kept in memory; uploads for new session ids are
    /// refused once this many exist
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 50 * 1024 * 1024, // 50MB
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
            max_sessions: 1000,
        }
    }
}

impl ServerConfig {
    /// Socket address string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for compatible APIs)
    pub openai_base_url: String,

    /// Chat completion model
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum tokens for completion (provider default when unset)
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

impl LlmConfig {
    /// The configured API key, or `MissingRequired`
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("OPENAI_API_KEY".to_string()))
    }
}

/// Similarity metric used by the vector index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl std::str::FromStr for DistanceMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            _ => Err(ConfigError::InvalidValue {
                key: "distance_metric".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Chunking and retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters carried from the tail of one chunk into the next
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    pub top_k: usize,

    /// Texts sent per embedding request
    pub embedding_batch_size: usize,

    /// Similarity metric for retrieval
    pub distance_metric: DistanceMetric,

    /// Optional cap on stuffed context length (characters)
    pub max_context_chars: Option<usize>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            embedding_batch_size: 100,
            distance_metric: DistanceMetric::Cosine,
            max_context_chars: None,
        }
    }
}

impl RagConfig {
    /// Validate chunking and retrieval bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunk_size".to_string(),
                value: self.chunk_size.to_string(),
            });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "chunk_overlap".to_string(),
                value: format!(
                    "{} (must be smaller than chunk_size {})",
                    self.chunk_overlap, self.chunk_size
                ),
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "top_k".to_string(),
                value: "0".to_string(),
            });
        }
        if self.embedding_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding_batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Chat history export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Directory that receives `chat_history_*.json` exports
    pub export_dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("."),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_sessions, 1000);
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config = AppConfig::default()
            .with_overrides(lookup_from(&[("OPENAI_API_KEY", "  ")]))
            .unwrap();
        assert!(config.llm.openai_api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::default()
            .with_overrides(lookup_from(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("API_PORT", "9000"),
                ("CHUNK_SIZE", "500"),
                ("CHUNK_OVERLAP", "50"),
                ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
                ("LOG_JSON", "true"),
                ("MAX_SESSIONS", "25"),
            ]))
            .unwrap();

        assert_eq!(config.llm.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(config.logging.json_format);
        assert_eq!(config.server.max_sessions, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_env_value() {
        let err = AppConfig::default()
            .with_overrides(lookup_from(&[("API_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "API_PORT"));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let rag = RagConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(rag.validate().is_err());

        let rag = RagConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            ..Default::default()
        };
        assert!(rag.validate().is_err());
    }

    #[test]
    fn test_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[rag]\nchunk_size = 800\ndistance_metric = \"euclidean\"\n\n[llm]\nmodel = \"gpt-4o-mini\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.rag.chunk_size, 800);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.rag.distance_metric, DistanceMetric::Euclidean);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_distance_metric_parse() {
        assert_eq!(
            "cosine".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Cosine
        );
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }
}
