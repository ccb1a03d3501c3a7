use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("malformed orbital elements: {0}")]
    MalformedElements(String),
    #[error("invalid observer location: {0}")]
    InvalidLocation(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE download failed: {0}")]
    Fetch(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
}

/// A single time step that could not be propagated.
#[derive(Debug, Clone, Error)]
#[error("propagation failed at {timestamp}: {message}")]
pub struct PropagationFailure {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl PropagationFailure {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}
