//! GraphQL server error types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GraphQL error reported by the server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphQLResponseError {
    /// Error message.
    pub message: String,
    /// Locations in the query where the error occurred.
    #[serde(default)]
    pub locations: Option<Vec<ErrorLocation>>,
    /// Path to the field that caused the error.
    #[serde(default)]
    pub path: Option<Vec<PathSegment>>,
    /// Additional error extensions.
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphQLResponseError {
    /// Read an entry of a server `errors` array.
    ///
    /// Servers do not always follow the GraphQL error shape, so entries that
    /// fail strict deserialization keep whatever `message` they carry, or
    /// their JSON text when they have none.
    pub fn from_value(value: &Value) -> Self {
        if let Ok(error) = serde_json::from_value::<Self>(value.clone()) {
            return error;
        }

        let message = match value.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        };

        Self {
            message,
            locations: None,
            path: None,
            extensions: value.get("extensions").cloned(),
        }
    }
}

impl std::fmt::Display for GraphQLResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(locations) = &self.locations
            && !locations.is_empty()
        {
            write!(f, " at ")?;
            for (i, loc) in locations.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}:{}", loc.line, loc.column)?;
            }
        }
        if let Some(path) = &self.path
            && !path.is_empty()
        {
            write!(f, " (path: {})", format_path(path))?;
        }
        Ok(())
    }
}

/// Location in the GraphQL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// Path segment in a GraphQL error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field name.
    Field(String),
    /// Array index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{}", name),
            Self::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// Format a path as a string.
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(".")
}
