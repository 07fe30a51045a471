use thiserror::Error;

/// Errors that can occur in the load generator library
#[derive(Error, Debug)]
pub enum LoadgenError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid state error
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias using LoadgenError
pub type Result<T> = std::result::Result<T, LoadgenError>;

impl From<String> for LoadgenError {
    fn from(s: String) -> Self {
        LoadgenError::Other(s)
    }
}

impl From<&str> for LoadgenError {
    fn from(s: &str) -> Self {
        LoadgenError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for LoadgenError {
    fn from(err: serde_json::Error) -> Self {
        LoadgenError::Serialization(err.to_string())
    }
}
