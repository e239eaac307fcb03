//! Service configuration
//!
//! Loaded from `config.toml` when present, otherwise built-in defaults
//! that match the stock all-MiniLM-L6-v2 layout.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Address the HTTP listener binds to, e.g. "0.0.0.0:5000"
    pub bind_address: String,
}

/// Where the model lives on disk and how to run it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Human-readable model name, reported by /health and /
    pub name: String,
    /// Path to the ONNX model file (model.onnx)
    pub model_path: String,
    /// Path to the tokenizer configuration (tokenizer.json)
    pub tokenizer_path: String,
    /// Output dimension of the model (384 for all-MiniLM-L6-v2)
    pub embedding_dimension: usize,
    /// Token sequences longer than this are truncated before inference
    pub max_sequence_length: usize,
    /// ONNX Runtime intra-op thread pool size
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                bind_address: "0.0.0.0:5000".to_string(),
            },
            model: ModelConfig {
                name: "all-MiniLM-L6-v2".to_string(),
                model_path: "models/all-MiniLM-L6-v2/model.onnx".to_string(),
                tokenizer_path: "models/all-MiniLM-L6-v2/tokenizer.json".to_string(),
                embedding_dimension: 384,
                max_sequence_length: 256,
                intra_threads: 4,
            },
            monitoring: MonitoringConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.network.bind_address, "0.0.0.0:5000");
        assert_eq!(config.model.name, "all-MiniLM-L6-v2");
        assert_eq!(config.model.embedding_dimension, 384);
        assert_eq!(config.monitoring.log_level, "info");
    }

    #[test]
    fn test_parse_config() {
        let config_str = r#"
            [network]
            bind_address = "127.0.0.1:8080"

            [model]
            name = "custom-model"
            model_path = "custom/model.onnx"
            tokenizer_path = "custom/tokenizer.json"
            embedding_dimension = 768
            max_sequence_length = 512
            intra_threads = 2
        "#;

        let config: ServerConfig = toml::from_str(config_str).unwrap();
        assert_eq!(config.network.bind_address, "127.0.0.1:8080");
        assert_eq!(config.model.embedding_dimension, 768);
        // monitoring section is optional
        assert_eq!(config.monitoring.log_level, "info");
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = ServerConfig::load_or_default("definitely/not/here.toml").unwrap();
        assert_eq!(config.network.bind_address, "0.0.0.0:5000");
    }
}
