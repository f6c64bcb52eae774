//! App id resolution, downstream invocation and response shaping.

use axum::http::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{PipelineError, ValidationError};
use crate::invoke::{InvocationRequest, Invoker};
use crate::pipeline::route::RouteKind;
use crate::web::request::WebhookResponse;

/// Pick the app a request targets.
///
/// A configured static app id claims the gateway exclusively: the dynamic
/// routes are disabled and answer 404. A missing app id is a 404 as well.
pub fn resolve_app_id(
    kind: RouteKind,
    path: &str,
    settings: &Settings,
) -> Result<String, PipelineError> {
    let static_app_id = settings.static_app_id();

    let app_id = if kind.is_dynamic() {
        if static_app_id.is_some() {
            info!(route = ?kind, "dynamic_route_disabled_by_static_app");
            return Err(PipelineError::NotFound);
        }
        kind.path_app_id(path)
    } else {
        static_app_id
    };

    match app_id {
        Some(id) => Ok(id.to_string()),
        None => {
            warn!(route = ?kind, path = %path, "app_id_missing");
            Err(PipelineError::NotFound)
        }
    }
}

/// Call the downstream service and shape its result into a response.
///
/// Errors from the call itself are returned untouched for the host to handle.
pub async fn dispatch(
    invoker: &dyn Invoker,
    kind: RouteKind,
    request: &InvocationRequest,
    settings: &Settings,
) -> Result<WebhookResponse, PipelineError> {
    let result = match (kind.is_chatflow(), request.query.as_deref()) {
        (true, Some(query)) => {
            invoker
                .invoke_chat(
                    &request.app_id,
                    query,
                    request.conversation_id.as_deref(),
                    &request.inputs,
                )
                .await?
        }
        (true, None) => return Err(ValidationError::InvalidQuery.into()),
        (false, _) => {
            invoker
                .invoke_workflow(&request.app_id, &request.inputs)
                .await?
        }
    };

    let body = if !kind.is_chatflow() && settings.raw_data_output {
        result
            .pointer("/data/outputs")
            .cloned()
            .ok_or(PipelineError::MissingOutputs)?
    } else {
        result
    };

    if is_empty_result(&body) {
        warn!(app_id = %request.app_id, route = ?kind, "downstream_empty_result");
        return Err(PipelineError::EmptyResult);
    }

    debug!(app_id = %request.app_id, route = ?kind, "downstream_result_received");
    Ok(WebhookResponse::json(StatusCode::OK, body))
}

/// Null, false, zero, and empty strings, arrays or objects count as no result.
fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_static(id: Option<&str>) -> Settings {
        Settings {
            static_app_id: id.map(String::from),
            ..Settings::default()
        }
    }

    #[test]
    fn test_resolve_dynamic() {
        let app_id = resolve_app_id(RouteKind::DynamicWorkflow, "/workflow/A", &with_static(None));
        assert_eq!(app_id.unwrap(), "A");
    }

    #[test]
    fn test_resolve_dynamic_disabled_by_static() {
        for (kind, path) in [
            (RouteKind::DynamicWorkflow, "/workflow/A"),
            (RouteKind::DynamicChatflow, "/chatflow/A"),
        ] {
            assert!(matches!(
                resolve_app_id(kind, path, &with_static(Some("S"))),
                Err(PipelineError::NotFound)
            ));
        }
    }

    #[test]
    fn test_resolve_blank_static_keeps_dynamic_enabled() {
        let app_id = resolve_app_id(RouteKind::DynamicChatflow, "/chatflow/A", &with_static(Some(" ")));
        assert_eq!(app_id.unwrap(), "A");
    }

    #[test]
    fn test_resolve_single() {
        let app_id = resolve_app_id(RouteKind::SingleChatflow, "/single-chatflow", &with_static(Some("S")));
        assert_eq!(app_id.unwrap(), "S");

        assert!(matches!(
            resolve_app_id(RouteKind::SingleWorkflow, "/single-workflow", &with_static(None)),
            Err(PipelineError::NotFound)
        ));
    }

    #[test]
    fn test_resolve_missing_path_id() {
        assert!(matches!(
            resolve_app_id(RouteKind::DynamicWorkflow, "/workflow/", &with_static(None)),
            Err(PipelineError::NotFound)
        ));
    }

    #[test]
    fn test_empty_results() {
        for value in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(is_empty_result(&value), "{value} should count as empty");
        }
        for value in [json!(true), json!(1), json!("x"), json!([0]), json!({ "a": null })] {
            assert!(!is_empty_result(&value), "{value} should count as a result");
        }
    }
}
