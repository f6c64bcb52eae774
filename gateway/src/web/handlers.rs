//! HTTP endpoint handlers.
//!
//! Every path other than `/health` is handed to the [`Pipeline`] as-is; the
//! pipeline decides whether it is routable.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::web::request::WebhookRequest;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/*path", post(invoke_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Invocation
// =============================================================================

/// Entry point for every invocation route.
///
/// The pipeline sees the percent-decoded path, so `/workflow/my%20app`
/// carries the app id `my app`.
pub async fn invoke_webhook(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = format!("/{}", path.trim_start_matches('/'));
    let request = WebhookRequest::new(method, path, uri.query(), headers, body);
    let path = request.path.clone();

    match state.pipeline.handle(request).await {
        Ok(response) => {
            info!(path = %path, status = response.status.as_u16(), "webhook_completed");
            response.into_response()
        }
        Err(e @ PipelineError::Invoke(_)) => {
            error!(path = %path, error = %e, "webhook_downstream_failed");
            e.into_response()
        }
        Err(e) => {
            warn!(path = %path, status = e.status().as_u16(), error = %e, "webhook_rejected");
            e.into_response()
        }
    }
}
