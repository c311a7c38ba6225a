use crate::error::RagError;
use crate::rag::RagEngine;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RagEngine>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Query endpoint and health check, open to any origin
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/search", post(search_handler))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serve `engine` on `addr` until the process is stopped
pub async fn serve(engine: Arc<RagEngine>, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(AppState { engine });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<String, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query text must not be empty".to_string()));
    }

    state
        .engine
        .answer(&request.query)
        .await
        .map_err(ApiError::from)
}

/// Error response with a plain-text body
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Pipeline(RagError),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::Pipeline(err) => {
                error!("search failed: {}", err);
                let status = if err.is_service_error() {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, err.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::embeddings::{Embedder, Embedding};
    use crate::index::InMemoryIndex;
    use crate::prompt::{ChatMessage, CompletionModel, REFUSAL};
    use crate::tokens::EstimatingCounter;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed_raw(&self, _text: &str) -> crate::error::Result<Embedding> {
            Ok(Embedding { values: vec![1.0] })
        }
    }

    struct RefusingModel {
        fail: bool,
    }

    #[async_trait]
    impl CompletionModel for RefusingModel {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
        ) -> crate::error::Result<String> {
            if self.fail {
                Err(RagError::CompletionService("model overloaded".to_string()))
            } else {
                Ok(REFUSAL.to_string())
            }
        }
    }

    fn app(fail: bool) -> Router {
        let engine = RagEngine::new(
            Arc::new(UnitEmbedder),
            Arc::new(InMemoryIndex::new()),
            Arc::new(RefusingModel { fail }),
            Arc::new(EstimatingCounter),
            &PipelineConfig::default(),
        );
        build_router(AppState {
            engine: Arc::new(engine),
        })
    }

    fn search_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/search")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ORIGIN, "https://docs.example.com")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_plain_text_answer() {
        let response = app(false)
            .oneshot(search_request(r#"{"query":"What is billing?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://docs.example.com"
        );
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body_text(response).await, REFUSAL);
    }

    #[tokio::test]
    async fn test_blank_query_is_bad_request() {
        let response = app(false)
            .oneshot(search_request(r#"{"query":"   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_service_failure_is_bad_gateway() {
        let response = app(true)
            .oneshot(search_request(r#"{"query":"anything"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response).await.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_preflight_allows_any_method_and_header() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/search")
            .header(header::ORIGIN, "https://docs.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom-header")
            .body(Body::empty())
            .unwrap();

        let response = app(false).oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://docs.example.com"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "x-custom-header"
        );
    }

    #[tokio::test]
    async fn test_healthz() {
        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();
        let response = app(false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
