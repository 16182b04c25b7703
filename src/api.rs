//! HTTP surface: `POST /generate-readme`, `GET /health`, `GET /`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{ErrorKind, ReadmeError};
use crate::orchestrator::{GenerationMethod, GenerationRequest, GenerationResult, ReadmeGenerator};
use crate::source::RepoUrl;

/// Request body of `POST /generate-readme`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReadmeRequest {
    /// GitHub repository URL
    pub repo_url: String,
    /// "Standard README" (default) or "README with Examples"
    #[serde(default)]
    pub generation_method: Option<String>,
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error type
    pub error: String,
    /// Human-readable detail
    pub message: String,
}

/// Errors returned before a generation run starts
#[derive(Debug)]
pub enum ApiError {
    /// Malformed URL or unknown method (400)
    BadRequest(String),
    /// The generator could not be initialized (503)
    Unavailable(String),
    /// Anything else (500)
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_type.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReadmeError> for ApiError {
    fn from(err: ReadmeError) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => ApiError::BadRequest(err.to_string()),
            ErrorKind::UpstreamUnavailable => ApiError::Unavailable(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

/// Shared handler state; `generator` is `None` when start-up initialization failed
#[derive(Clone, Default)]
pub struct AppState {
    /// The README generator
    pub generator: Option<Arc<ReadmeGenerator>>,
}

impl AppState {
    /// State with a ready generator
    pub fn ready(generator: Arc<ReadmeGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// State that answers every generation request with 503
    pub fn uninitialized() -> Self {
        Self { generator: None }
    }
}

/// Builds the router with CORS for `cors_origins` and request tracing
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/generate-readme", post(generate_readme))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Root endpoint - basic service information
async fn index() -> Json<Value> {
    Json(json!({
        "service": "gitreadme",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Generate README documents for GitHub repositories",
        "endpoints": {
            "health": "/health",
            "generate": "/generate-readme"
        }
    }))
}

/// Liveness probe
async fn health_check() -> &'static str {
    "OK"
}

/// Runs one generation; validation failures are rejected before any fetch
async fn generate_readme(
    State(state): State<AppState>,
    Json(request): Json<GenerateReadmeRequest>,
) -> Result<Json<GenerationResult>, ApiError> {
    let method = match request.generation_method.as_deref() {
        Some(label) => label.parse::<GenerationMethod>()?,
        None => GenerationMethod::default(),
    };
    let repo = RepoUrl::parse(&request.repo_url)?;

    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("README generator is not initialized".into()))?;

    info!(repo = %repo, method = %method, "README requested");
    let result = generator
        .generate(&GenerationRequest::new(request.repo_url.trim(), method))
        .await;
    Ok(Json(result))
}
