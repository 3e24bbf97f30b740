//! Server error types.

use thiserror::Error;

use horde_core::error::GameError;

/// Errors loading server configuration and match data.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON file.
    #[error("Failed to parse RON file '{path}': {source}")]
    ParseError {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// A data document was rejected by the core parsers.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A setting is out of range.
    #[error("Invalid setting '{field}': {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors talking to a running match.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The match loop has stopped and no longer accepts commands.
    #[error("Match loop is not running")]
    Stopped,

    /// Snapshot could not be encoded.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
