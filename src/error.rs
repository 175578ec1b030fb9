//! Error types for the discovery engine

use thiserror::Error;

/// Result type for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Message shown when a request could not complete and the server gave no reason.
pub const GENERIC_NETWORK_MESSAGE: &str = "Network error. Please try again.";

/// Discovery error types
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Request could not complete
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("Server error {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected schema
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Operation needs an authenticated session
    #[error("Authentication required")]
    RequiresAuth,

    /// Search submitted with nothing but whitespace
    #[error("Search query is empty")]
    EmptyQuery,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    /// Message suitable for a user-facing notification.
    ///
    /// Server-supplied messages pass through verbatim; everything else
    /// collapses to the generic network message.
    pub fn user_message(&self) -> String {
        match self {
            DiscoveryError::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_NETWORK_MESSAGE.to_string(),
        }
    }

    /// Precondition failures are rejected before any request is issued
    pub fn is_precondition(&self) -> bool {
        matches!(self, DiscoveryError::RequiresAuth | DiscoveryError::EmptyQuery)
    }
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DiscoveryError::InvalidPayload(err.to_string())
        } else {
            DiscoveryError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        DiscoveryError::InvalidPayload(err.to_string())
    }
}

impl From<toml::de::Error> for DiscoveryError {
    fn from(err: toml::de::Error) -> Self {
        DiscoveryError::Config(err.to_string())
    }
}
