//! Extraction of `inputs`, `query` and `conversation_id` from a request body.
//!
//! With `explicit_inputs` the inputs live under `body.inputs` and the chat
//! fields are read from the top level of the body. Without it the whole body
//! is the inputs map, minus the chat fields for chatflow routes. The parsed
//! body is never modified; a fresh inputs map is built instead.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::pipeline::route::RouteKind;

/// Body fields ready to hand downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub inputs: Map<String, Value>,
    /// Always `Some` for chatflow routes, `None` for workflows
    pub query: Option<String>,
    pub conversation_id: Option<String>,
}

pub fn normalize(
    body: &Value,
    explicit_inputs: bool,
    kind: RouteKind,
) -> Result<NormalizedInput, ValidationError> {
    let Value::Object(fields) = body else {
        return Err(ValidationError::InvalidInputsType);
    };

    let inputs = if explicit_inputs {
        match fields.get("inputs") {
            None => Map::new(),
            Some(Value::Object(inputs)) => inputs.clone(),
            Some(_) => return Err(ValidationError::InvalidInputsType),
        }
    } else {
        fields.clone()
    };

    if !kind.is_chatflow() {
        return Ok(NormalizedInput {
            inputs,
            query: None,
            conversation_id: None,
        });
    }

    let mut inputs = inputs;
    if !explicit_inputs {
        inputs.remove("query");
        inputs.remove("conversation_id");
    }

    let query = match fields.get("query") {
        Some(Value::String(query)) if !query.is_empty() => query.clone(),
        _ => return Err(ValidationError::InvalidQuery),
    };

    let conversation_id = match fields.get("conversation_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => return Err(ValidationError::InvalidConversationId),
    };

    Ok(NormalizedInput {
        inputs,
        query: Some(query),
        conversation_id,
    })
}
