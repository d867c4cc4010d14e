//! Relay requests and their GraphQL operation payloads.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::RelayRequestError;

/// Whether a request reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// A query. Queries may be batched together.
    Query,
    /// A mutation. Mutations are always sent on their own.
    Mutation,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
        }
    }
}

/// GraphQL operation payload, serialized as the GraphQL-over-HTTP body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// The GraphQL document.
    pub query: String,
    /// Operation name (for documents with multiple operations).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Variables for the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    /// Extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl Operation {
    /// Create a new operation.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
            extensions: None,
        }
    }

    /// Set the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set variables.
    pub fn variables<T: Serialize>(mut self, variables: T) -> Self {
        self.variables = Some(serde_json::to_value(variables).unwrap_or_default());
        self
    }

    /// Set a single variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let vars = self
            .variables
            .get_or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = vars {
            map.insert(name.into(), serde_json::to_value(value).unwrap_or_default());
        }
        self
    }

    /// Set extensions.
    pub fn extensions(mut self, extensions: Value) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

#[derive(Debug, Clone)]
enum RequestState {
    Pending,
    Resolved(Value),
    Rejected(RelayRequestError),
}

/// A logical GraphQL request tracked until it settles.
///
/// A request starts pending and is settled exactly once, either with the
/// server's `data` or with a [`RelayRequestError`]. The caller keeps
/// ownership; the network layer settles it in place.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    id: String,
    kind: RequestKind,
    operation: Operation,
    state: RequestState,
}

impl RelayRequest {
    /// Create a pending request.
    pub fn new(id: impl Into<String>, kind: RequestKind, operation: Operation) -> Self {
        Self {
            id: id.into(),
            kind,
            operation,
            state: RequestState::Pending,
        }
    }

    /// Create a pending query.
    pub fn query(id: impl Into<String>, operation: Operation) -> Self {
        Self::new(id, RequestKind::Query, operation)
    }

    /// Create a pending mutation.
    pub fn mutation(id: impl Into<String>, operation: Operation) -> Self {
        Self::new(id, RequestKind::Mutation, operation)
    }

    /// Request identity.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Query or mutation.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The operation payload.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Name used in error messages: the operation name, or the id.
    pub fn debug_name(&self) -> &str {
        self.operation.operation_name.as_deref().unwrap_or(self.id.as_str())
    }

    /// The `data` the server returned, once resolved.
    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            RequestState::Resolved(data) => Some(data),
            _ => None,
        }
    }

    /// The failure, once rejected.
    pub fn error(&self) -> Option<&RelayRequestError> {
        match &self.state {
            RequestState::Rejected(error) => Some(error),
            _ => None,
        }
    }

    /// Check if the request has reached its terminal state.
    pub fn is_settled(&self) -> bool {
        !matches!(self.state, RequestState::Pending)
    }

    /// Consume the request, returning its outcome if settled.
    pub fn into_result(self) -> Option<Result<Value, RelayRequestError>> {
        match self.state {
            RequestState::Pending => None,
            RequestState::Resolved(data) => Some(Ok(data)),
            RequestState::Rejected(error) => Some(Err(error)),
        }
    }

    /// Settle the request. Returns `false` if it was already settled.
    pub(crate) fn settle(&mut self, outcome: Result<Value, RelayRequestError>) -> bool {
        if self.is_settled() {
            warn!(id = %self.id, "Ignoring second settlement of relay request");
            return false;
        }

        self.state = match outcome {
            Ok(data) => RequestState::Resolved(data),
            Err(error) => RequestState::Rejected(error),
        };
        true
    }
}
