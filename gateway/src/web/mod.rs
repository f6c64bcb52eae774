//! Web server module for handling inbound webhooks.
//!
//! This module provides:
//! - Ed25519 signature verification for interaction webhooks
//! - The middleware chain and API key check run ahead of routing
//! - Request/response types shared by the pipeline stages
//! - The axum router and handlers

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod request;
pub mod signature;

pub use auth::check_api_key;
pub use handlers::{health, invoke_webhook, router, AppState, HealthResponse};
pub use middleware::{DefaultMiddleware, MiddlewareDispatcher, WebhookMiddleware};
pub use request::{NormalizedBody, WebhookRequest, WebhookResponse};
pub use signature::{verify_webhook_signature, verify_with_key, SignatureVerifier, VerifyRequest};
