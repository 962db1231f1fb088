//! Pingdom client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Pingdom API
#[derive(Debug, Error)]
pub enum PingdomError {
    /// HTTP request/response error (connection, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Pingdom API returned a non-success status
    #[error("Pingdom API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API answered with a body that does not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PingdomError {
    /// HTTP status code carried by the error, if the remote answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PingdomError::Api { status, .. } => Some(*status),
            PingdomError::NotFound(_) => Some(404),
            PingdomError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
