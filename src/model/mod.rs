//! Embedding model abstraction
//!
//! The HTTP layer talks to a `TextEmbedder` trait object so the model can be
//! loaded once at startup and injected as shared state, and so handlers can
//! be tested without model weights.

#[cfg(feature = "onnx")]
pub mod onnx;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors that can occur in embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model load failed: {error}")]
    ModelLoadFailed { error: String },

    #[error("Tokenization failed: {error}")]
    TokenizationFailed { error: String },

    #[error("Inference failed: {error}")]
    InferenceFailed { error: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for EmbeddingError {
    fn from(error: ort::Error) -> Self {
        EmbeddingError::ModelLoadFailed {
            error: error.to_string(),
        }
    }
}

/// Information about the loaded model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name
    pub name: String,
    /// Embedding dimension, fixed for the process lifetime
    pub dimension: usize,
    /// Maximum token sequence length
    pub max_sequence_length: usize,
}

/// Core embedding model trait
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding>;

    /// Generate embeddings for a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize {
        self.info().dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_info() {
        let info = ModelInfo {
            name: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            max_sequence_length: 256,
        };

        assert_eq!(info.name, "all-MiniLM-L6-v2");
        assert_eq!(info.dimension, 384);
    }

    #[test]
    fn test_error_display() {
        let err = EmbeddingError::InvalidInput {
            message: "empty text list".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid input: empty text list");
    }
}
