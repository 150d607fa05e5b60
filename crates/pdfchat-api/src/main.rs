//! PDFChat API Server
//!
//! Author: hephaex@gmail.com

use pdfchat_api::{create_router, state::AppState};
use pdfchat_core::{AppConfig, LoggingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config_path = std::env::var("PDFCHAT_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path)?;

    init_tracing(&config.logging);

    // A missing credential is fatal at startup
    config.validate()?;

    let addr = config.server.bind_addr();

    // Create application state
    let state = Arc::new(AppState::from_config(config)?);
    tracing::info!(
        model = %state.config.llm.model,
        embedding_model = %state.config.llm.embedding_model,
        top_k = state.qa.top_k(),
        "RAG pipeline configured"
    );

    // Create router
    let app = create_router(Arc::clone(&state));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("PDFChat API Server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", logging.level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    state.set_ready(false);
    tracing::info!("Shutdown signal received");
}
