//! Request failure taxonomy.
//!
//! Every pipeline stage returns `Result<_, PipelineError>`; the mapping to an
//! HTTP status and JSON payload happens only in [`PipelineError::into_response`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::invoke::InvokeError;
use crate::web::request::WebhookResponse;

/// Field-level problems with the request body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("inputs must be an object")]
    InvalidInputsType,

    #[error("query must be a string")]
    InvalidQuery,

    #[error("conversation_id must be a string")]
    InvalidConversationId,
}

/// Failures raised inside a middleware stage.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("request body is not valid UTF-8: {0}")]
    BodyEncoding(#[from] std::str::Utf8Error),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Authentication is enabled but no key was configured.
    #[error("Expected API key is not configured.")]
    ApiKeyNotConfigured,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown path, missing app id, or a dynamic route disabled by a static app.
    #[error("not found")]
    NotFound,

    #[error("Middleware error: {0}")]
    Middleware(MiddlewareError),

    #[error("Default Middleware error: {0}")]
    DefaultMiddleware(MiddlewareError),

    /// The request body could not be parsed as JSON.
    #[error("{0}")]
    InvalidBody(String),

    #[error("workflow response has no data.outputs")]
    MissingOutputs,

    #[error("Failed to get response")]
    EmptyResult,

    /// The downstream call itself failed; surfaced by the host boundary.
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidApiKey => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Invoke(_) => StatusCode::BAD_GATEWAY,
            Self::ApiKeyNotConfigured
            | Self::Middleware(_)
            | Self::DefaultMiddleware(_)
            | Self::InvalidBody(_)
            | Self::MissingOutputs
            | Self::EmptyResult => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The response sent to the caller for this failure.
    pub fn to_response(&self) -> WebhookResponse {
        match self {
            Self::NotFound => WebhookResponse::empty(self.status()),
            Self::Invoke(_) => WebhookResponse::error(self.status(), "downstream invocation failed"),
            other => WebhookResponse::error(other.status(), other.to_string()),
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}
