//! Configuration module for environment variable parsing.
//!
//! Everything the gateway needs is read once at startup into an immutable
//! [`Config`]. The route behavior lives in [`Settings`], which is validated
//! before the server accepts its first request.

use std::env;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use crate::web::signature::{SignatureError, SignatureVerifier};

/// Pre-processor run ahead of the default middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MiddlewareKind {
    /// Only the default middleware runs.
    #[default]
    None,
    /// Ed25519-signed interaction webhooks (Discord style).
    Webhook,
}

impl FromStr for MiddlewareKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "webhook" | "discord" => Ok(Self::Webhook),
            other => Err(format!("unknown middleware '{}'", other)),
        }
    }
}

/// Where the caller's API key is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiKeyLocation {
    /// `x-api-key` request header
    #[default]
    Header,
    /// `difyToken` query parameter
    QueryParam,
    /// Authentication disabled
    None,
}

impl FromStr for ApiKeyLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" | "api_key_header" => Ok(Self::Header),
            "query" | "query_param" | "token_query_param" => Ok(Self::QueryParam),
            "none" => Ok(Self::None),
            other => Err(format!("unknown api key location '{}'", other)),
        }
    }
}

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("signature_verification_key is required when the webhook middleware is enabled")]
    MissingSignatureKey,

    #[error("invalid signature_verification_key: {0}")]
    InvalidSignatureKey(#[from] SignatureError),
}

/// Behavioral settings for the invocation routes.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Optional pre-processor in front of the default middleware
    pub middleware: MiddlewareKind,

    /// Hex-encoded Ed25519 public key, required for the webhook middleware
    pub signature_verification_key: Option<String>,

    /// Where to look for the caller's API key
    pub api_key_location: ApiKeyLocation,

    /// Expected API key
    pub api_key: Option<String>,

    /// Read inputs from `body.inputs` instead of the whole body
    pub explicit_inputs: bool,

    /// Reply with `data.outputs` only for workflow invocations
    pub raw_data_output: bool,

    /// Pins the gateway to one app and disables the dynamic routes
    pub static_app_id: Option<String>,

    /// Hand the body downstream as a pre-serialized JSON string
    pub json_string_input: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            middleware: MiddlewareKind::None,
            signature_verification_key: None,
            api_key_location: ApiKeyLocation::Header,
            api_key: None,
            explicit_inputs: true,
            raw_data_output: false,
            static_app_id: None,
            json_string_input: false,
        }
    }
}

impl Settings {
    /// Load route settings from `RELAYHOOK_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        Settings {
            middleware: parse_enum("RELAYHOOK_MIDDLEWARE", defaults.middleware),
            signature_verification_key: parse_optional("RELAYHOOK_SIGNATURE_VERIFICATION_KEY"),
            api_key_location: parse_enum("RELAYHOOK_API_KEY_LOCATION", defaults.api_key_location),
            api_key: parse_optional("RELAYHOOK_API_KEY"),
            explicit_inputs: parse_bool("RELAYHOOK_EXPLICIT_INPUTS", defaults.explicit_inputs),
            raw_data_output: parse_bool("RELAYHOOK_RAW_DATA_OUTPUT", defaults.raw_data_output),
            static_app_id: parse_optional("RELAYHOOK_STATIC_APP_ID"),
            json_string_input: parse_bool("RELAYHOOK_JSON_STRING_INPUT", defaults.json_string_input),
        }
    }

    /// Static app id, if one is configured and non-blank.
    pub fn static_app_id(&self) -> Option<&str> {
        self.static_app_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Build the signature verifier required by the configured middleware.
    ///
    /// Returns `Ok(None)` when no middleware needs one.
    pub fn signature_verifier(&self) -> Result<Option<SignatureVerifier>, ConfigError> {
        match self.middleware {
            MiddlewareKind::None => Ok(None),
            MiddlewareKind::Webhook => {
                let key = self
                    .signature_verification_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(ConfigError::MissingSignatureKey)?;
                Ok(Some(SignatureVerifier::from_hex(key)?))
            }
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Route behavior
    pub settings: Settings,

    /// Base URL of the chat/workflow service
    pub downstream_base_url: String,

    /// Bearer token sent to the chat/workflow service
    pub downstream_api_key: Option<String>,

    /// Transport timeout for downstream calls in milliseconds
    pub downstream_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            settings: Settings::from_env(),

            downstream_base_url: env::var("DOWNSTREAM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5001".to_string()),

            downstream_api_key: parse_optional("DOWNSTREAM_API_KEY"),

            downstream_timeout_ms: env::var("DOWNSTREAM_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60_000),
        }
    }
}

/// Parse a boolean flag, accepting the usual spellings.
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

/// Read an optional string, treating blank values as unset.
fn parse_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_enum<T: FromStr<Err = String>>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
            warn!(env_var = name, value = %raw, error = %e, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
