//! Response classification.
//!
//! Status code takes priority over body shape: a non-2xx response is an
//! [`Outcome::HttpStatus`] even when its body happens to be valid GraphQL JSON.

use relay_network_http::Response;
use serde_json::Value;

use crate::GraphQLResponseError;

/// Categorical result of inspecting a received response.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The server returned `data` and no errors.
    Success(Value),
    /// The server returned a non-empty `errors` array.
    GraphQLErrors {
        /// Parsed server errors, in server order.
        errors: Vec<GraphQLResponseError>,
        /// The full payload.
        payload: Value,
    },
    /// A 2xx response whose body is not a usable GraphQL payload.
    Malformed {
        /// What was wrong with it.
        reason: MalformedReason,
        /// The payload, when it was valid JSON.
        payload: Option<Value>,
    },
    /// A response with a status outside `[200, 300)`.
    HttpStatus(Response),
}

impl Outcome {
    /// Check if this outcome resolves the request.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Why a 2xx payload could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// The payload has no `data` key.
    MissingData,
    /// The body is not valid JSON.
    InvalidJson(String),
    /// A batched call did not answer with a JSON array.
    NotABatch,
    /// A batched call answered without an entry for this request.
    MissingBatchEntry {
        /// Id of the request left unanswered.
        id: String,
    },
}

/// Classify a response to a single (unbatched) call.
pub fn classify(response: &Response) -> Outcome {
    if !response.is_success() {
        return Outcome::HttpStatus(response.clone());
    }

    match response.json::<Value>() {
        Ok(payload) => classify_payload(payload),
        Err(e) => Outcome::Malformed {
            reason: MalformedReason::InvalidJson(e.to_string()),
            payload: None,
        },
    }
}

/// Classify an already-parsed GraphQL payload.
pub fn classify_payload(payload: Value) -> Outcome {
    if let Some(Value::Array(errors)) = payload.get("errors")
        && !errors.is_empty()
    {
        let errors = errors.iter().map(GraphQLResponseError::from_value).collect();
        return Outcome::GraphQLErrors { errors, payload };
    }

    match payload {
        Value::Object(mut map) if map.contains_key("data") => {
            Outcome::Success(map.remove("data").unwrap_or(Value::Null))
        }
        payload => Outcome::Malformed {
            reason: MalformedReason::MissingData,
            payload: Some(payload),
        },
    }
}
