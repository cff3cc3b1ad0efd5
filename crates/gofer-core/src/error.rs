//! Error types for Gofer extensions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Identifier errors
    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    // Subscription errors
    #[error("Subscription already exists: {0}")]
    SubscriptionExists(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Missing subscription parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid subscription parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    // Event errors
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid repository '{0}': expected owner/name")]
    InvalidRepository(String),

    #[error("Invalid payload signature")]
    InvalidSignature,

    #[error("Malformed event payload: {0}")]
    InvalidPayload(String),

    // Host errors
    #[error("Host unreachable: {0}")]
    Transport(String),

    #[error("Host returned {status_code}: {body}")]
    Http { status_code: u16, body: String },

    #[error("Could not decode host response: {0}")]
    Decode(String),

    // Lifecycle errors
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the failure happened before the host produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// True when the failure is a problem with caller-supplied input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidIdentifier { .. }
                | Error::MissingParameter(_)
                | Error::InvalidParameter { .. }
                | Error::UnknownEvent(_)
                | Error::InvalidRepository(_)
                | Error::InvalidPayload(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
