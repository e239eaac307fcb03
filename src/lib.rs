//! Text Embedding Service Library
//!
//! HTTP service that maps text to sentence-embedding vectors using a
//! pretrained ONNX model loaded once at startup

pub mod config;
pub mod model;
pub mod protocol;
pub mod server;

// Re-exports
pub use config::ServerConfig;
pub use model::{Embedding, EmbeddingError, ModelInfo, TextEmbedder};
pub use protocol::{EmbedRequest, EmbedResponse, ErrorResponse};
pub use server::start_http_server;
