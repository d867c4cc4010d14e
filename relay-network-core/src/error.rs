//! Per-request error representation.

use relay_network_http::{HttpClientError, Response};
use serde_json::Value;
use thiserror::Error;

use crate::classify::{MalformedReason, Outcome};
use crate::{GraphQLResponseError, RequestKind};

/// Category of a request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No HTTP response was obtained.
    Network,
    /// A response arrived with a status outside 2xx.
    HttpStatus,
    /// A 2xx response carried GraphQL errors.
    GraphQLErrors,
    /// A 2xx response did not contain a usable payload.
    MalformedResponse,
}

/// Failure attached to a [`RelayRequest`](crate::RelayRequest).
///
/// Display is the message alone, so it can be shown to users as is.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RelayRequestError {
    kind: ErrorKind,
    message: String,
    fetch_response: Option<Response>,
    graphql_errors: Vec<GraphQLResponseError>,
    payload: Option<Value>,
}

impl RelayRequestError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fetch_response: None,
            graphql_errors: Vec::new(),
            payload: None,
        }
    }

    /// A transport failure; the message is the raised condition's own text.
    pub fn network(err: &HttpClientError) -> Self {
        Self::new(ErrorKind::Network, err.detail())
    }

    /// A non-2xx response; the message is the raw body text.
    pub fn http_status(response: Response) -> Self {
        let mut error = Self::new(ErrorKind::HttpStatus, response.text_lossy());
        error.fetch_response = Some(response);
        error
    }

    /// GraphQL errors reported for the named operation.
    pub fn graphql(
        kind: RequestKind,
        debug_name: &str,
        errors: Vec<GraphQLResponseError>,
        payload: Value,
    ) -> Self {
        let reasons = errors
            .iter()
            .enumerate()
            .map(|(i, error)| format!("{}. {}", i + 1, error))
            .collect::<Vec<_>>()
            .join("\n");

        let mut error = Self::new(
            ErrorKind::GraphQLErrors,
            format!(
                "Server request for {kind} `{debug_name}` failed for the following reasons:\n\n{reasons}"
            ),
        );
        error.graphql_errors = errors;
        error.payload = Some(payload);
        error
    }

    /// An unusable 2xx payload.
    pub fn malformed(
        kind: RequestKind,
        debug_name: &str,
        reason: &MalformedReason,
        payload: Option<Value>,
    ) -> Self {
        let message = match reason {
            MalformedReason::MissingData => {
                format!("Server response.data was missing for {kind} `{debug_name}`.")
            }
            MalformedReason::InvalidJson(e) => format!("Server response was not valid JSON: {e}"),
            MalformedReason::NotABatch => {
                "Server response for batched queries was not a JSON array.".to_string()
            }
            MalformedReason::MissingBatchEntry { id } => {
                format!("Server does not return response for request with id `{id}`.")
            }
        };

        let mut error = Self::new(ErrorKind::MalformedResponse, message);
        error.payload = payload;
        error
    }

    /// Failure category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The raw response, for [`ErrorKind::HttpStatus`] failures.
    pub fn fetch_response(&self) -> Option<&Response> {
        self.fetch_response.as_ref()
    }

    /// Status code of the raw response, if one is attached.
    pub fn status(&self) -> Option<u16> {
        self.fetch_response.as_ref().map(|r| r.status().as_u16())
    }

    /// Server errors, for [`ErrorKind::GraphQLErrors`] failures.
    pub fn graphql_errors(&self) -> &[GraphQLResponseError] {
        &self.graphql_errors
    }

    /// The JSON payload the server returned, when there was one.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Check if this is a transport failure.
    pub fn is_network_error(&self) -> bool {
        self.kind == ErrorKind::Network
    }
}

/// Map a classifier outcome to the request's terminal value.
pub fn normalize(
    outcome: Outcome,
    kind: RequestKind,
    debug_name: &str,
) -> Result<Value, RelayRequestError> {
    match outcome {
        Outcome::Success(data) => Ok(data),
        Outcome::GraphQLErrors { errors, payload } => {
            Err(RelayRequestError::graphql(kind, debug_name, errors, payload))
        }
        Outcome::Malformed { reason, payload } => Err(RelayRequestError::malformed(
            kind, debug_name, &reason, payload,
        )),
        Outcome::HttpStatus(response) => Err(RelayRequestError::http_status(response)),
    }
}
