//! Per-request types flowing through the pipeline.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Body canonicalized by the default middleware.
///
/// When attached to a request it replaces the raw body for everything
/// downstream of the middleware stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBody {
    pub json_string: String,
}

impl NormalizedBody {
    pub fn to_value(&self) -> Value {
        json!({ "json_string": self.json_string })
    }
}

/// An inbound call, as seen by the pipeline.
#[derive(Debug)]
pub struct WebhookRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: Bytes,
    parsed: OnceLock<Result<Value, String>>,
    normalized: Option<NormalizedBody>,
}

impl WebhookRequest {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: Option<&str>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let query = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            method,
            path: path.into(),
            headers,
            query,
            body,
            parsed: OnceLock::new(),
            normalized: None,
        }
    }

    /// Header value by case-insensitive name, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Raw body parsed as JSON, at most once per request.
    pub fn json(&self) -> Result<&Value, &str> {
        self.parsed
            .get_or_init(|| serde_json::from_slice(&self.body).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(String::as_str)
    }

    pub fn attach_normalized(&mut self, normalized: NormalizedBody) {
        self.normalized = Some(normalized);
    }

    pub fn normalized(&self) -> Option<&NormalizedBody> {
        self.normalized.as_ref()
    }

    /// The body the rest of the pipeline works on: the normalized body when
    /// middleware attached one, the parsed raw body otherwise.
    pub fn effective_body(&self) -> Result<Cow<'_, Value>, &str> {
        match &self.normalized {
            Some(normalized) => Ok(Cow::Owned(normalized.to_value())),
            None => self.json().map(Cow::Borrowed),
        }
    }
}

/// A response produced by the pipeline or one of its stages.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl WebhookResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "error": message.into() }))
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}
