//! Tool error types.

use thiserror::Error;

use horde_core::error::GameError;

/// Errors from the data tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A document failed to parse.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Failed to encode output.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Documents parsed but reference each other inconsistently.
    #[error("{} problem(s) found: {}", .0.len(), .0.join("; "))]
    Invalid(Vec<String>),
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;
