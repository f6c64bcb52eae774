//! Relayhook - webhook ingress for chat and workflow apps.
//!
//! Accepts external webhook/API calls, authenticates them, normalizes their
//! bodies and relays them to a downstream chat/workflow service, answering
//! synchronously with the service's JSON result.
//!
//! ## Architecture
//!
//! ```text
//! Caller → Web Server → Pipeline → Invoker → chat/workflow service
//! ```
//!
//! Routes:
//! - `POST /workflow/{app_id}` and `POST /chatflow/{app_id}`: app chosen by the caller
//! - `POST /single-workflow` and `POST /single-chatflow`: app pinned by configuration

pub mod config;
pub mod error;
pub mod invoke;
pub mod pipeline;
pub mod web;

// Re-export commonly used types
pub use config::{ApiKeyLocation, Config, ConfigError, MiddlewareKind, Settings};
pub use error::{PipelineError, ValidationError};
pub use invoke::{HttpInvoker, InvocationRequest, InvokeError, Invoker};
pub use pipeline::{Pipeline, RouteKind};
pub use web::AppState;
