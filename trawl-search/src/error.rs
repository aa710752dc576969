//! Error types for query construction and search execution.

use thiserror::Error;

/// A node was serialized while missing required state.
///
/// Raised locally before any request is sent. Fix the node and serialize
/// again; nothing retries these automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An aggregation or suggester has an empty name.
    #[error("{kind} requires a non-empty name")]
    MissingName {
        /// Node kind, as it appears on the wire.
        kind: &'static str,
    },

    /// A required parameter is unset or empty.
    #[error("{kind} requires `{field}`")]
    MissingField {
        /// Node kind, as it appears on the wire.
        kind: &'static str,
        /// Parameter name.
        field: &'static str,
    },

    /// Neither of two alternative parameters is set.
    #[error("{kind} requires either `{first}` or `{second}`")]
    MissingEither {
        /// Node kind, as it appears on the wire.
        kind: &'static str,
        /// First alternative.
        first: &'static str,
        /// Second alternative.
        second: &'static str,
    },

    /// A range query has no lower or upper bound.
    #[error("range query on `{field}` needs at least one bound")]
    MissingBound {
        /// Field the range applies to.
        field: String,
    },

    /// A raw fragment is not a JSON object.
    #[error("{kind} must be a JSON object")]
    NotAnObject {
        /// Node kind.
        kind: &'static str,
    },
}

/// Search error type.
///
/// Cloneable so a failed scroll can hand the same terminal error to every
/// later pull.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Request document failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Network or connection failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The cluster answered with an error document or a failure status.
    #[error("Remote error ({status}) {error_type}: {reason}")]
    Remote {
        /// HTTP status.
        status: u16,
        /// Error type reported by the cluster.
        error_type: String,
        /// Human readable reason.
        reason: String,
    },

    /// Response body could not be decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid client or pool configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No pooled client became available.
    #[error("Pool error: {0}")]
    Pool(String),

    /// The scroll worker stopped without reporting an outcome.
    #[error("Scroll interrupted: {0}")]
    Interrupted(String),
}

impl SearchError {
    /// Whether the error happened before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }

    /// Remote error type, if the cluster reported one.
    pub fn remote_type(&self) -> Option<&str> {
        match self {
            SearchError::Remote { error_type, .. } => Some(error_type),
            _ => None,
        }
    }
}

impl From<opensearch::Error> for SearchError {
    fn from(err: opensearch::Error) -> Self {
        SearchError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Protocol(err.to_string())
    }
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
