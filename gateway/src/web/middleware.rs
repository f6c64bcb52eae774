//! Request pre-processing ahead of authentication.
//!
//! The dispatcher runs at most one provider middleware (currently the
//! Ed25519 interaction webhook) and then always the default middleware.
//! A stage that produces a response ends the pipeline.

use axum::http::{Method, StatusCode};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, Settings};
use crate::error::{MiddlewareError, PipelineError};
use crate::web::request::{NormalizedBody, WebhookRequest, WebhookResponse};
use crate::web::signature::{SignatureVerifier, VerifyRequest};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Interaction `type` sent by the provider to probe the endpoint.
pub const PROBE_TYPE: i64 = 0;

/// Interaction `type` of a real event notification.
pub const EVENT_TYPE: i64 = 1;

/// Signed interaction webhooks.
///
/// Answers probes and event notifications itself; anything else that is
/// correctly signed falls through to the rest of the pipeline.
pub struct WebhookMiddleware<V = SignatureVerifier> {
    verifier: V,
}

impl<V: VerifyRequest> WebhookMiddleware<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    pub fn process(
        &self,
        request: &WebhookRequest,
    ) -> Result<Option<WebhookResponse>, MiddlewareError> {
        debug!(body_length = request.body.len(), "webhook_middleware_received");

        let signature = request.header(SIGNATURE_HEADER);
        let timestamp = request.header(TIMESTAMP_HEADER);

        let verified = match (signature, timestamp) {
            (Some(signature), Some(timestamp)) => {
                let body = std::str::from_utf8(&request.body)?;
                self.verifier.verify(signature, timestamp, body.as_bytes())
            }
            _ => {
                warn!(
                    has_signature = signature.is_some(),
                    has_timestamp = timestamp.is_some(),
                    "webhook_signature_headers_missing"
                );
                false
            }
        };

        if !verified {
            warn!("webhook_signature_invalid");
            return Ok(Some(WebhookResponse::error(
                StatusCode::UNAUTHORIZED,
                "invalid request signature",
            )));
        }

        if request.method != Method::POST {
            return Ok(None);
        }

        match interaction_type(request) {
            Some(PROBE_TYPE) => {
                info!("webhook_probe_acknowledged");
                Ok(Some(WebhookResponse::empty(StatusCode::NO_CONTENT)))
            }
            Some(EVENT_TYPE) => {
                info!("webhook_event_acknowledged");
                Ok(Some(WebhookResponse::json(
                    StatusCode::OK,
                    json!({ "type": EVENT_TYPE }),
                )))
            }
            _ => {
                debug!("webhook_interaction_unclassified");
                Ok(None)
            }
        }
    }
}

/// `type` field of the body, if the body is JSON and carries a whole number.
///
/// `0.0` and `1.0` count the same as `0` and `1`.
fn interaction_type(request: &WebhookRequest) -> Option<i64> {
    match request.json() {
        Ok(body) => body.get("type").and_then(|t| {
            t.as_i64().or_else(|| {
                t.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }),
        Err(e) => {
            debug!(error = %e, "webhook_body_not_json");
            None
        }
    }
}

/// Optional body canonicalization, run for every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMiddleware;

impl DefaultMiddleware {
    /// Attaches a [`NormalizedBody`] when `json_string_input` is enabled.
    ///
    /// Never produces a response. A body that is not JSON is logged and left
    /// for the later stages to reject.
    pub fn process(
        &self,
        request: &mut WebhookRequest,
        settings: &Settings,
    ) -> Result<Option<WebhookResponse>, MiddlewareError> {
        if !settings.json_string_input {
            return Ok(None);
        }

        let json_string = match request.json() {
            Ok(body) => serde_json::to_string(body)?,
            Err(e) => {
                warn!(error = %e, "default_middleware_parse_failed");
                return Ok(None);
            }
        };

        debug!(length = json_string.len(), "default_middleware_body_normalized");
        request.attach_normalized(NormalizedBody { json_string });

        Ok(None)
    }
}

/// Runs the configured middleware chain.
pub struct MiddlewareDispatcher<V = SignatureVerifier> {
    webhook: Option<WebhookMiddleware<V>>,
    default: DefaultMiddleware,
}

impl MiddlewareDispatcher<SignatureVerifier> {
    /// Build the chain described by `settings`, failing fast on a bad key.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self::new(settings.signature_verifier()?.map(WebhookMiddleware::new)))
    }
}

impl<V: VerifyRequest> MiddlewareDispatcher<V> {
    pub fn new(webhook: Option<WebhookMiddleware<V>>) -> Self {
        Self {
            webhook,
            default: DefaultMiddleware,
        }
    }

    pub fn apply(
        &self,
        request: &mut WebhookRequest,
        settings: &Settings,
    ) -> Result<Option<WebhookResponse>, PipelineError> {
        if let Some(webhook) = &self.webhook {
            if let Some(response) = webhook.process(request).map_err(PipelineError::Middleware)? {
                return Ok(Some(response));
            }
        }

        self.default
            .process(request, settings)
            .map_err(PipelineError::DefaultMiddleware)
    }
}
