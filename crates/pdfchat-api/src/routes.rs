//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::{documents, history, query};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", post(documents::upload_document))
        .route("/query", post(query::query_handler))
        .route("/history", get(history::get_history))
        .route("/history/export", post(history::export_history))
}
