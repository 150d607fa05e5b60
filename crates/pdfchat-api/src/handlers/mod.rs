//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod documents;
pub mod health;
pub mod history;
pub mod query;

use crate::state::DEFAULT_SESSION_ID;
use axum::http::HeaderMap;

/// Header selecting the chat session
pub const SESSION_HEADER: &str = "x-session-id";

/// Session id from the request headers, `default` when absent or blank
pub fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}
