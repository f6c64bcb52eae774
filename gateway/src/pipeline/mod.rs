//! The request-processing pipeline.
//!
//! ## Processing Flow
//!
//! ```text
//! WebhookRequest → middleware → API key → route → inputs → Invoker → WebhookResponse
//! ```
//!
//! Middleware and API key checks may answer early. Everything is per-request;
//! the only shared state is the read-only settings and the invoker.

pub mod dispatch;
pub mod inputs;
pub mod route;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigError, Settings};
use crate::error::PipelineError;
use crate::invoke::{InvocationRequest, Invoker};
use crate::web::auth::check_api_key;
use crate::web::middleware::MiddlewareDispatcher;
use crate::web::request::{WebhookRequest, WebhookResponse};

pub use dispatch::{dispatch, resolve_app_id};
pub use inputs::{normalize, NormalizedInput};
pub use route::RouteKind;

pub struct Pipeline {
    settings: Settings,
    middleware: MiddlewareDispatcher,
    invoker: Arc<dyn Invoker>,
}

impl Pipeline {
    /// Assemble the stages; fails when the signature key cannot be used.
    ///
    /// A missing `api_key` is not rejected here; requests report it as a
    /// server-side misconfiguration instead.
    pub fn new(settings: Settings, invoker: Arc<dyn Invoker>) -> Result<Self, ConfigError> {
        let middleware = MiddlewareDispatcher::from_settings(&settings)?;

        Ok(Self {
            settings,
            middleware,
            invoker,
        })
    }

    /// Run one request through every stage.
    pub async fn handle(
        &self,
        mut request: WebhookRequest,
    ) -> Result<WebhookResponse, PipelineError> {
        info!(
            method = %request.method,
            path = %request.path,
            body_length = request.body.len(),
            "pipeline_request_received"
        );

        if let Some(response) = self.middleware.apply(&mut request, &self.settings)? {
            debug!(status = response.status.as_u16(), "pipeline_middleware_responded");
            return Ok(response);
        }

        check_api_key(&request, &self.settings)?;

        let kind = RouteKind::classify(&request.path).ok_or_else(|| {
            info!(path = %request.path, "pipeline_route_unknown");
            PipelineError::NotFound
        })?;
        info!(route = ?kind, "pipeline_routed");

        let app_id = resolve_app_id(kind, &request.path, &self.settings)?;

        let body = request
            .effective_body()
            .map_err(|e| PipelineError::InvalidBody(e.to_string()))?;
        let input = normalize(&body, self.settings.explicit_inputs, kind)?;

        let invocation = InvocationRequest {
            app_id,
            inputs: input.inputs,
            query: input.query,
            conversation_id: input.conversation_id,
        };

        dispatch(self.invoker.as_ref(), kind, &invocation, &self.settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::InvokeError;
    use async_trait::async_trait;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubInvoker {
        result: Value,
        calls: Mutex<Vec<InvocationRequest>>,
    }

    #[async_trait]
    impl Invoker for StubInvoker {
        async fn invoke_chat(
            &self,
            app_id: &str,
            query: &str,
            conversation_id: Option<&str>,
            inputs: &Map<String, Value>,
        ) -> Result<Value, InvokeError> {
            self.calls.lock().unwrap().push(InvocationRequest {
                app_id: app_id.to_string(),
                inputs: inputs.clone(),
                query: Some(query.to_string()),
                conversation_id: conversation_id.map(String::from),
            });
            Ok(self.result.clone())
        }

        async fn invoke_workflow(
            &self,
            app_id: &str,
            inputs: &Map<String, Value>,
        ) -> Result<Value, InvokeError> {
            self.calls.lock().unwrap().push(InvocationRequest {
                app_id: app_id.to_string(),
                inputs: inputs.clone(),
                query: None,
                conversation_id: None,
            });
            Ok(self.result.clone())
        }
    }

    fn pipeline(settings: Settings, result: Value) -> (Pipeline, Arc<StubInvoker>) {
        let invoker = Arc::new(StubInvoker {
            result,
            ..StubInvoker::default()
        });
        let pipeline = Pipeline::new(settings, invoker.clone()).unwrap();
        (pipeline, invoker)
    }

    fn open_settings() -> Settings {
        Settings {
            api_key_location: crate::config::ApiKeyLocation::None,
            ..Settings::default()
        }
    }

    fn post(path: &str, body: &'static str) -> WebhookRequest {
        WebhookRequest::new(
            Method::POST,
            path,
            None,
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[tokio::test]
    async fn test_single_chatflow_scenario() {
        let settings = Settings {
            static_app_id: Some("A".to_string()),
            ..open_settings()
        };
        let (pipeline, invoker) = pipeline(settings, json!({ "answer": "hello" }));

        let response = pipeline
            .handle(post("/single-chatflow", r#"{"query":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Some(json!({ "answer": "hello" })));

        let calls = invoker.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[InvocationRequest {
                app_id: "A".to_string(),
                inputs: Map::new(),
                query: Some("hi".to_string()),
                conversation_id: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_raw_data_output() {
        let result = json!({ "data": { "outputs": { "x": 1 } } });

        let settings = Settings {
            raw_data_output: true,
            ..open_settings()
        };
        let (raw, _) = pipeline(settings, result.clone());
        let response = raw.handle(post("/workflow/A", "{}")).await.unwrap();
        assert_eq!(response.body, Some(json!({ "x": 1 })));

        let (full, _) = pipeline(open_settings(), result.clone());
        let response = full.handle(post("/workflow/A", "{}")).await.unwrap();
        assert_eq!(response.body, Some(result));
    }

    #[tokio::test]
    async fn test_raw_data_output_ignored_for_chat() {
        let settings = Settings {
            raw_data_output: true,
            ..open_settings()
        };
        let (pipeline, _) = pipeline(settings, json!({ "data": { "answer": "a" } }));

        let response = pipeline
            .handle(post("/chatflow/A", r#"{"query":"q"}"#))
            .await
            .unwrap();
        assert_eq!(response.body, Some(json!({ "data": { "answer": "a" } })));
    }

    #[tokio::test]
    async fn test_missing_outputs() {
        let settings = Settings {
            raw_data_output: true,
            ..open_settings()
        };
        let (pipeline, _) = pipeline(settings, json!({ "data": {} }));

        let error = pipeline.handle(post("/workflow/A", "{}")).await.unwrap_err();
        assert!(matches!(error, PipelineError::MissingOutputs));
    }

    #[tokio::test]
    async fn test_empty_result_is_failure() {
        let (pipeline, _) = pipeline(open_settings(), json!({}));

        let error = pipeline.handle(post("/workflow/A", "{}")).await.unwrap_err();
        assert!(matches!(error, PipelineError::EmptyResult));
        assert_eq!(
            error.to_response().body,
            Some(json!({ "error": "Failed to get response" }))
        );
    }

    #[tokio::test]
    async fn test_validation_stops_before_invoke() {
        let (pipeline, invoker) = pipeline(open_settings(), json!({ "ok": true }));

        let error = pipeline
            .handle(post("/workflow/A", r#"{"inputs":"not-a-map"}"#))
            .await
            .unwrap_err();

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_app_disables_dynamic_before_parsing() {
        let settings = Settings {
            static_app_id: Some("S".to_string()),
            ..open_settings()
        };
        let (pipeline, invoker) = pipeline(settings, json!({ "ok": true }));

        let error = pipeline
            .handle(post("/chatflow/A", "{broken"))
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::NotFound));
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let (pipeline, _) = pipeline(open_settings(), json!({ "ok": true }));

        let error = pipeline
            .handle(post("/workflow/A", "{broken"))
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::InvalidBody(_)));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_auth_runs_before_routing() {
        let (pipeline, _) = pipeline(
            Settings {
                api_key: Some("secret".to_string()),
                ..Settings::default()
            },
            json!({ "ok": true }),
        );

        let error = pipeline.handle(post("/unknown", "{}")).await.unwrap_err();
        assert!(matches!(error, PipelineError::InvalidApiKey));
    }

    #[tokio::test]
    async fn test_json_string_input_reaches_invoker() {
        let settings = Settings {
            json_string_input: true,
            explicit_inputs: false,
            ..open_settings()
        };
        let (pipeline, invoker) = pipeline(settings, json!({ "ok": true }));

        pipeline
            .handle(post("/workflow/A", r#"{"b":1,"a":2}"#))
            .await
            .unwrap();

        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls[0].inputs.get("json_string"), Some(&json!(r#"{"a":2,"b":1}"#)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            middleware: crate::config::MiddlewareKind::Webhook,
            ..Settings::default()
        };
        let result = Pipeline::new(settings, Arc::new(StubInvoker::default()));
        assert!(matches!(result, Err(ConfigError::MissingSignatureKey)));
    }

    #[test]
    fn test_undecodable_signature_key_rejected() {
        let settings = Settings {
            middleware: crate::config::MiddlewareKind::Webhook,
            signature_verification_key: Some("abcd".to_string()),
            ..Settings::default()
        };
        let result = Pipeline::new(settings, Arc::new(StubInvoker::default()));
        assert!(matches!(result, Err(ConfigError::InvalidSignatureKey(_))));
    }
}
