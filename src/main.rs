//! Text Embedding Service
//!
//! Loads the embedding model, then serves POST /embed until terminated.
//! A model that fails to load is fatal; the listener never starts.

use std::sync::Arc;

use textembed::model::onnx::OnnxEmbedder;
use textembed::{start_http_server, ServerConfig, TextEmbedder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load_or_default("config.toml")?;

    // RUST_LOG wins; otherwise the config's log level applies
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        match config.monitoring.log_level.to_lowercase().as_str() {
            "trace" => "textembed=trace,trace".to_string(),
            "debug" => "textembed=debug,debug".to_string(),
            "info" => "textembed=info,info".to_string(),
            "warn" => "textembed=warn,warn".to_string(),
            "error" => "textembed=error,error".to_string(),
            _ => "textembed=info,info".to_string(),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .init();

    // Load the model exactly once, before accepting any connections
    let embedder: Arc<dyn TextEmbedder> = Arc::new(OnnxEmbedder::from_config(&config.model)?);

    start_http_server(Arc::new(config), embedder).await?;

    Ok(())
}
