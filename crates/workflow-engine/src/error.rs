//! Error types for the workflow engine

use thiserror::Error;

/// Result type alias using WorkflowError
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur in the workflow engine
///
/// Graph mutators never return these: rejected edits are reported as
/// `false`/`None` and stale ids are ignored. Errors come from node
/// evaluation, configuration loading, undo snapshots and the suggestion
/// collaborator.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A string that does not name a node kind
    #[error("Unknown node kind: '{0}'")]
    UnknownNodeKind(String),

    /// A node config field holds the wrong JSON type
    #[error("Invalid config '{key}' on node '{node_id}': expected {expected}")]
    InvalidConfig {
        node_id: String,
        key: String,
        expected: String,
    },

    /// The node suggestion collaborator failed
    #[error("Suggestion failed: {0}")]
    Suggestion(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// Create an invalid config error for a node field
    pub fn invalid_config(
        node_id: impl Into<String>,
        key: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            node_id: node_id.into(),
            key: key.into(),
            expected: expected.into(),
        }
    }
}
