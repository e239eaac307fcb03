//! HTTP wire types
//!
//! The endpoint contract is:
//! - Request: `{"text": "..."}`
//! - Success: `{"vector": [0.1, 0.2, ...]}`
//! - Validation error: `{"error": "no text provided"}` with status 400
//!
//! `text` defaults to the empty string when the field is missing, so a
//! missing field and an explicit empty string take the same error path.

use serde::{Deserialize, Serialize};

/// Embedding request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub text: String,
}

impl EmbedRequest {
    /// Validate the request; the only checked failure is empty/missing text.
    pub fn validate(&self) -> Result<(), ErrorResponse> {
        if self.text.is_empty() {
            return Err(ErrorResponse::no_text());
        }
        Ok(())
    }
}

/// Embedding response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// The embedding vector
    pub vector: Vec<f32>,
}

impl EmbedResponse {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

/// Error response body. Carries only a message; callers are promised no
/// richer structure than this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// The documented validation error for empty or missing text
    pub fn no_text() -> Self {
        Self::new("no text provided")
    }

    pub fn invalid_json() -> Self {
        Self::new("invalid JSON body")
    }

    pub fn not_found() -> Self {
        Self::new("not found")
    }

    pub fn internal_error() -> Self {
        Self::new("embedding generation failed")
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub version: String,
    pub embedding_dimension: usize,
}

impl HealthResponse {
    pub fn healthy(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            model: model.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            embedding_dimension: dimension,
        }
    }
}
