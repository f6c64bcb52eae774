//! Downstream chat and workflow invocation.
//!
//! The gateway never runs chat or workflow apps itself. It hands a
//! validated [`InvocationRequest`] to an [`Invoker`] and relays the result.
//!
//! ```text
//! Pipeline → Invoker::invoke_chat / invoke_workflow → chat/workflow service
//! ```

pub mod http;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use http::HttpInvoker;

/// Response mode requested from the downstream service.
pub const RESPONSE_MODE: &str = "blocking";

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invalid downstream url: {0}")]
    Url(#[from] url::ParseError),

    #[error("downstream base url cannot carry a path")]
    CannotBeABase,

    #[error("downstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("downstream returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// A fully validated call, ready for the downstream service.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub app_id: String,
    pub inputs: Map<String, Value>,
    /// Present for chatflow routes only
    pub query: Option<String>,
    pub conversation_id: Option<String>,
}

/// The external chat/workflow service.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run one conversational turn.
    async fn invoke_chat(
        &self,
        app_id: &str,
        query: &str,
        conversation_id: Option<&str>,
        inputs: &Map<String, Value>,
    ) -> Result<Value, InvokeError>;

    /// Run a workflow once; the result carries `data.outputs`.
    async fn invoke_workflow(
        &self,
        app_id: &str,
        inputs: &Map<String, Value>,
    ) -> Result<Value, InvokeError>;
}
