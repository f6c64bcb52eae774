//! HTTP client for the chat/workflow service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use url::Url;

use super::{InvokeError, Invoker, RESPONSE_MODE};

/// Invokes apps over the service's REST API.
///
/// - chat: `POST {base}/v1/apps/{app_id}/chat-messages`
/// - workflow: `POST {base}/v1/apps/{app_id}/workflows/run`
#[derive(Clone)]
pub struct HttpInvoker {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpInvoker {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InvokeError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(InvokeError::CannotBeABase);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// `{base}/v1/apps/{app_id}/{action...}`, with `app_id` percent-encoded.
    fn endpoint(&self, app_id: &str, action: &[&str]) -> Result<Url, InvokeError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InvokeError::CannotBeABase)?
            .pop_if_empty()
            .extend(["v1", "apps", app_id])
            .extend(action);
        Ok(url)
    }

    async fn post(&self, url: Url, body: Value) -> Result<Value, InvokeError> {
        let mut request = self.client.post(url.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                url = %url,
                status = status.as_u16(),
                body_length = body.len(),
                "downstream_error_status"
            );
            return Err(InvokeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke_chat(
        &self,
        app_id: &str,
        query: &str,
        conversation_id: Option<&str>,
        inputs: &Map<String, Value>,
    ) -> Result<Value, InvokeError> {
        let url = self.endpoint(app_id, &["chat-messages"])?;
        info!(app_id = %app_id, has_conversation = conversation_id.is_some(), "downstream_chat_invoke");

        self.post(
            url,
            json!({
                "query": query,
                "conversation_id": conversation_id,
                "inputs": inputs,
                "response_mode": RESPONSE_MODE,
            }),
        )
        .await
    }

    async fn invoke_workflow(
        &self,
        app_id: &str,
        inputs: &Map<String, Value>,
    ) -> Result<Value, InvokeError> {
        let url = self.endpoint(app_id, &["workflows", "run"])?;
        info!(app_id = %app_id, input_count = inputs.len(), "downstream_workflow_invoke");

        self.post(
            url,
            json!({
                "inputs": inputs,
                "response_mode": RESPONSE_MODE,
            }),
        )
        .await
    }
}
