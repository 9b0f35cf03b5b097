//! Error types for the server.

use std::path::PathBuf;

use oxide_web::BuildError;

/// Errors that can occur while starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// IO error (binding, accepting, reading the config file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The application could not be built.
    #[error("Failed to build app: {0}")]
    Build(#[from] BuildError),

    /// The configuration file is not valid.
    #[error("Invalid config file '{path}': {message}")]
    Config {
        /// Path to the configuration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServeError>;
