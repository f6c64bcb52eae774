//! API key check for the invocation routes.

use tracing::{error, warn};

use crate::config::{ApiKeyLocation, Settings};
use crate::error::PipelineError;
use crate::web::request::WebhookRequest;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY_PARAM: &str = "difyToken";

/// Check the caller's API key against the configured one.
///
/// `Ok(())` means the request is authorized.
pub fn check_api_key(request: &WebhookRequest, settings: &Settings) -> Result<(), PipelineError> {
    let expected = settings.api_key.as_deref().filter(|k| !k.is_empty());

    let provided = match settings.api_key_location {
        ApiKeyLocation::None => return Ok(()),
        ApiKeyLocation::Header => request.header(API_KEY_HEADER),
        ApiKeyLocation::QueryParam => request.query_param(API_KEY_QUERY_PARAM),
    };

    let Some(expected) = expected else {
        error!(location = ?settings.api_key_location, "api_key_not_configured");
        return Err(PipelineError::ApiKeyNotConfigured);
    };

    match provided {
        Some(provided) if constant_time_compare(provided, expected) => Ok(()),
        Some(_) => {
            warn!(location = ?settings.api_key_location, "api_key_invalid");
            Err(PipelineError::InvalidApiKey)
        }
        None => {
            warn!(location = ?settings.api_key_location, "api_key_missing");
            Err(PipelineError::InvalidApiKey)
        }
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
