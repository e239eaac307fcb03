//! ONNX embedding engine
//!
//! Runs a sentence-embedding model (all-MiniLM-L6-v2 by default) locally
//! through ONNX Runtime with a HuggingFace tokenizer. No Python anywhere.
//!
//! For each text: tokenize, run the transformer, mean-pool the
//! `last_hidden_state` over non-padding tokens, L2-normalize. This matches
//! the sentence-transformers encoding of the same model, so outputs are
//! 384-dimensional unit vectors.

use ndarray::ArrayViewD;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::model::{Embedding, EmbeddingError, EmbeddingResult, ModelInfo, TextEmbedder};

/// ONNX-backed text embedder. Loaded once at startup; the session sits
/// behind a mutex because ONNX Runtime inference takes `&mut`.
pub struct OnnxEmbedder {
    info: ModelInfo,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxEmbedder {
    /// Load the model and tokenizer from the paths in `config`.
    ///
    /// Fails if the model file or tokenizer file cannot be loaded; the
    /// caller is expected to treat that as fatal at startup.
    pub fn from_config(config: &ModelConfig) -> EmbeddingResult<Self> {
        info!(
            "Loading ONNX model '{}' from {}",
            config.name, config.model_path
        );

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?
            .commit_from_file(&config.model_path)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                error: format!("Failed to load ONNX model: {}", e),
            })?;

        let tokenizer =
            Tokenizer::from_file(&config.tokenizer_path).map_err(|e| {
                EmbeddingError::ModelLoadFailed {
                    error: format!("Failed to load tokenizer: {}", e),
                }
            })?;

        info!(
            "Model loaded ({} dims, max {} tokens, {} threads)",
            config.embedding_dimension, config.max_sequence_length, config.intra_threads
        );

        Ok(Self {
            info: ModelInfo {
                name: config.name.clone(),
                dimension: config.embedding_dimension,
                max_sequence_length: config.max_sequence_length,
            },
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Tokenize and run one text through the model.
    fn encode_one(&self, session: &mut Session, text: &str) -> EmbeddingResult<Embedding> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                error: e.to_string(),
            })?;

        // Truncate to the model's maximum sequence length
        let seq_len = encoding.get_ids().len().min(self.info.max_sequence_length);
        let input_ids = &encoding.get_ids()[..seq_len];
        let attention_mask = &encoding.get_attention_mask()[..seq_len];

        let input_ids_vec: Vec<i64> = input_ids.iter().map(|&x| x as i64).collect();
        let attention_mask_vec: Vec<i64> = attention_mask.iter().map(|&x| x as i64).collect();
        // Single sequence, so all token type ids are zero
        let token_type_ids_vec: Vec<i64> = vec![0i64; seq_len];

        let shape = [1i64, seq_len as i64];
        let input_ids_tensor =
            Tensor::from_array((shape, input_ids_vec)).map_err(tensor_error)?;
        let attention_mask_tensor =
            Tensor::from_array((shape, attention_mask_vec)).map_err(tensor_error)?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids_vec)).map_err(tensor_error)?;

        let outputs = session
            .run(vec![
                ("input_ids", input_ids_tensor),
                ("attention_mask", attention_mask_tensor),
                ("token_type_ids", token_type_ids_tensor),
            ])
            .map_err(|e| EmbeddingError::InferenceFailed {
                error: format!("ONNX inference failed: {}", e),
            })?;

        let (out_shape, data) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbeddingError::InferenceFailed {
                error: format!("Failed to extract output tensor: {}", e),
            })?;

        let dims: Vec<usize> = out_shape.iter().map(|&x| x as usize).collect();
        let token_embeddings = ndarray::ArrayView::from_shape(dims.as_slice(), data)
            .map_err(|e| EmbeddingError::InferenceFailed {
                error: format!("Unexpected output tensor shape: {:?}", e),
            })?;

        let pooled = mean_pooling(&token_embeddings, attention_mask)?;
        l2_normalize(&pooled)
    }
}

fn tensor_error(e: ort::Error) -> EmbeddingError {
    EmbeddingError::InferenceFailed {
        error: format!("Failed to create input tensor: {}", e),
    }
}

/// Mean-pool token embeddings over the sequence dimension, counting only
/// tokens where the attention mask is 1.
///
/// `token_embeddings` has shape [1, seq_len, hidden_size].
fn mean_pooling(
    token_embeddings: &ArrayViewD<f32>,
    attention_mask: &[u32],
) -> EmbeddingResult<Embedding> {
    let shape = token_embeddings.shape();
    if shape.len() != 3 {
        return Err(EmbeddingError::InferenceFailed {
            error: format!("Expected 3D output tensor, got {}D", shape.len()),
        });
    }

    let seq_len = shape[1];
    let hidden_size = shape[2];

    if attention_mask.len() != seq_len {
        return Err(EmbeddingError::InferenceFailed {
            error: format!(
                "Attention mask length {} doesn't match sequence length {}",
                attention_mask.len(),
                seq_len
            ),
        });
    }

    let mut pooled = vec![0.0f32; hidden_size];
    let mut valid_tokens = 0usize;

    for seq_idx in 0..seq_len {
        if attention_mask[seq_idx] == 1 {
            for hidden_idx in 0..hidden_size {
                pooled[hidden_idx] += token_embeddings[[0, seq_idx, hidden_idx]];
            }
            valid_tokens += 1;
        }
    }

    if valid_tokens == 0 {
        return Err(EmbeddingError::InferenceFailed {
            error: "No valid tokens in attention mask".to_string(),
        });
    }

    for val in &mut pooled {
        *val /= valid_tokens as f32;
    }

    Ok(pooled)
}

/// L2-normalize an embedding to a unit vector.
fn l2_normalize(embedding: &[f32]) -> EmbeddingResult<Embedding> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm == 0.0 {
        return Err(EmbeddingError::InferenceFailed {
            error: "Cannot normalize zero vector".to_string(),
        });
    }

    Ok(embedding.iter().map(|x| x / norm).collect())
}

#[async_trait::async_trait]
impl TextEmbedder for OnnxEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        let mut session = self.session.lock().await;
        self.encode_one(&mut session, text)
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(EmbeddingError::InvalidInput {
                message: "Cannot embed empty text list".to_string(),
            });
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut session = self.session.lock().await;
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.encode_one(&mut session, text)?);
        }
        Ok(embeddings)
    }
}
