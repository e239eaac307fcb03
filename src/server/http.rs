//! Hyper HTTP server
//!
//! Direct Hyper service, no router crate. Routes:
//! - POST /embed   - generate an embedding
//! - GET  /health  - liveness probe
//! - GET  /        - service info

use std::convert::Infallible;
use std::sync::Arc;

use hyper::body::to_bytes;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tokio::net::TcpSocket;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::model::TextEmbedder;
use crate::protocol::{EmbedRequest, EmbedResponse, ErrorResponse, HealthResponse};

/// Shared state injected into every request handler
#[derive(Clone)]
struct ServerState {
    embedder: Arc<dyn TextEmbedder>,
}

/// Bind the listener and serve until the process is terminated.
///
/// The embedder must already be loaded; nothing here retries or reloads it.
pub async fn start_http_server(
    config: Arc<ServerConfig>,
    embedder: Arc<dyn TextEmbedder>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bind_address = config.network.bind_address.clone();

    info!("Starting HTTP embedding server");
    info!("Binding to {}", bind_address);

    let state = ServerState { embedder };

    let make_svc = make_service_fn(move |_| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let state = state.clone();
                handle_request(req, state)
            }))
        }
    });

    let addr = bind_address.parse()?;

    // TCP_NODELAY matters here: responses are small JSON bodies and Nagle
    // buffering adds tens of milliseconds per request.
    let socket = TcpSocket::new_v4()?;
    socket.set_nodelay(true)?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;

    let server = Server::from_tcp(listener.into_std()?)?
        .http1_keepalive(true)
        .tcp_nodelay(true)
        .serve(make_svc);

    info!("Listening on {}", bind_address);
    info!("Endpoints:");
    info!("   POST /embed   - Generate embedding");
    info!("   GET  /health  - Health check");
    info!("   GET  /        - Service info");

    server.await?;

    Ok(())
}

/// Match-based routing, one arm per endpoint
async fn handle_request(
    req: Request<Body>,
    state: ServerState,
) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/embed") => handle_embed(req, state).await,
        (&Method::GET, "/health") => handle_health(state),
        (&Method::GET, "/") => handle_root(state),
        (&Method::OPTIONS, _) => handle_options(),
        _ => error_response(StatusCode::NOT_FOUND, ErrorResponse::not_found()),
    };

    Ok(response)
}

/// OPTIONS handler for CORS preflight
fn handle_options() -> Response<Body> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("access-control-allow-origin", "*")
        .header("access-control-allow-methods", "GET, POST, OPTIONS")
        .header("access-control-allow-headers", "content-type")
        .body(Body::empty())
        .unwrap()
}

/// Root endpoint - service info
fn handle_root(state: ServerState) -> Response<Body> {
    let info = serde_json::json!({
        "name": "textembed",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.embedder.info().name,
        "endpoints": {
            "embed": { "method": "POST", "path": "/embed" },
            "health": { "method": "GET", "path": "/health" },
        },
    });

    json_response(StatusCode::OK, info.to_string())
}

/// Health check endpoint. The model is loaded before the listener starts,
/// so a live process implies a ready model.
fn handle_health(state: ServerState) -> Response<Body> {
    debug!("Health check requested");
    let info = state.embedder.info();
    let response = HealthResponse::healthy(&info.name, info.dimension);
    json_response(
        StatusCode::OK,
        serde_json::to_string(&response).unwrap_or_default(),
    )
}

/// Embedding endpoint
async fn handle_embed(req: Request<Body>, state: ServerState) -> Response<Body> {
    let body_bytes = match to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("failed to read request body"),
            );
        }
    };

    let request: EmbedRequest = match serde_json::from_slice(&body_bytes) {
        Ok(req) => req,
        Err(_) => {
            return error_response(StatusCode::BAD_REQUEST, ErrorResponse::invalid_json());
        }
    };

    if let Err(err) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, err);
    }

    // Single-element batch, take the single output vector
    let texts = vec![request.text];
    match state.embedder.embed_batch(&texts).await {
        Ok(mut embeddings) if !embeddings.is_empty() => {
            let vector = embeddings.swap_remove(0);
            debug!("Generated embedding with {} dimensions", vector.len());
            let response = EmbedResponse::new(vector);
            match serde_json::to_string(&response) {
                Ok(json_body) => json_response(StatusCode::OK, json_body),
                Err(e) => {
                    error!("Response serialization failed: {}", e);
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::internal_error(),
                    )
                }
            }
        }
        Ok(_) => {
            error!("Embedder returned no vectors for a one-element batch");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::internal_error(),
            )
        }
        Err(e) => {
            error!("Embedding generation failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::internal_error(),
            )
        }
    }
}

fn json_response(status: StatusCode, body: String) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn error_response(status: StatusCode, error: ErrorResponse) -> Response<Body> {
    json_response(
        status,
        serde_json::to_string(&error).unwrap_or_else(|_| r#"{"error":"internal"}"#.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Embedding, EmbeddingError, EmbeddingResult, ModelInfo};
    use async_trait::async_trait;

    /// Deterministic stand-in so handlers can be tested without model weights
    struct MockEmbedder {
        info: ModelInfo,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                info: ModelInfo {
                    name: "mock-model".to_string(),
                    dimension: 384,
                    max_sequence_length: 256,
                },
            }
        }

        fn vector_for(&self, text: &str) -> Embedding {
            // Distinct per input, identical across calls with the same input
            let seed = text.bytes().map(|b| b as f32).sum::<f32>();
            (0..self.info.dimension)
                .map(|i| (seed + i as f32) / 1000.0)
                .collect()
        }
    }

    #[async_trait]
    impl TextEmbedder for MockEmbedder {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
            Ok(self.vector_for(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
            if texts.is_empty() {
                return Err(EmbeddingError::InvalidInput {
                    message: "Cannot embed empty text list".to_string(),
                });
            }
            Ok(texts.iter().map(|t| self.vector_for(t)).collect())
        }
    }

    fn test_state() -> ServerState {
        ServerState {
            embedder: Arc::new(MockEmbedder::new()),
        }
    }

    fn post_embed(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/embed")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_embed_valid_text() {
        let response = handle_embed(post_embed(r#"{"text": "hello world"}"#), test_state()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let vector = json["vector"].as_array().unwrap();
        assert_eq!(vector.len(), 384);
        assert!(vector.iter().all(|v| v.as_f64().unwrap().is_finite()));
    }

    #[tokio::test]
    async fn test_embed_empty_text() {
        let response = handle_embed(post_embed(r#"{"text": ""}"#), test_state()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({"error": "no text provided"}));
    }

    #[tokio::test]
    async fn test_embed_missing_text_field() {
        let response = handle_embed(post_embed("{}"), test_state()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({"error": "no text provided"}));
    }

    #[tokio::test]
    async fn test_embed_malformed_json() {
        let response = handle_embed(post_embed("{not json"), test_state()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_embed_is_deterministic() {
        let first = handle_embed(post_embed(r#"{"text": "same input"}"#), test_state()).await;
        let second = handle_embed(post_embed(r#"{"text": "same input"}"#), test_state()).await;

        assert_eq!(body_json(first).await, body_json(second).await);
    }

    #[tokio::test]
    async fn test_health() {
        let response = handle_health(test_state());
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["embedding_dimension"], 384);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let response = handle_request(req, test_state()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
