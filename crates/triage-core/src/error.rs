//! Error types for the triage assistant.

use thiserror::Error;

/// Result type alias using the triage Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for triage operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed required input. Fatal to the current request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Ticket, project or user does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ticket store or LLM answered with a non-OK status.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// HTTP/network request failed before a response was received.
    #[error("Request error: {0}")]
    Request(String),

    /// Upstream answered but the body could not be understood.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Operation exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error came from an external collaborator rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Upstream(_) | Error::Request(_) | Error::MalformedResponse(_) | Error::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_decode() {
            Error::MalformedResponse(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}
