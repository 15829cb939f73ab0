use subfox_domain::{SubscriptionId, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Cache write failed: {0}")]
    Cache(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Subscription not found: {0}")]
    NotFound(SubscriptionId),
    #[error("No active session. Log in first.")]
    NoSession,
}

/// Failure talking to the remote store. Always recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote store is not configured: {0}")]
    NotConfigured(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("remote store answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected remote response: {0}")]
    Decode(String),
    #[error("session is not authorized for the remote store")]
    Unauthorized,
}
