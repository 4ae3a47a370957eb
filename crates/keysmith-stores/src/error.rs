//! Store error types

use keysmith_credentials::{PortalError, RemoteError};
use thiserror::Error;

/// Errors of the remote store and developer portal clients
#[derive(Debug, Error)]
pub enum StoreError {
    /// No or rejected credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid credentials
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// GraphQL errors in an otherwise successful response
    #[error("GraphQL error: {message}")]
    Graphql {
        code: Option<String>,
        message: String,
    },

    /// API error from the server
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The team has too many distribution certificates
    #[error("Certificate limit reached: {0}")]
    CertificateLimit(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Operation this client cannot perform
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Command execution failed
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for RemoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AuthenticationFailed(message) | StoreError::InvalidCredentials(message) => {
                RemoteError::Unauthenticated(message)
            }
            StoreError::NotFound(message) => RemoteError::NotFound(message),
            StoreError::Graphql { code, message } => match code.as_deref() {
                Some("UNAUTHENTICATED") => RemoteError::Unauthenticated(message),
                Some("NOT_FOUND") => RemoteError::NotFound(message),
                _ => RemoteError::Api(message),
            },
            StoreError::Http(e) => RemoteError::Transport(e.to_string()),
            StoreError::Io(e) => RemoteError::Transport(e.to_string()),
            other => RemoteError::Api(other.to_string()),
        }
    }
}

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AuthenticationFailed(message) | StoreError::InvalidCredentials(message) => {
                PortalError::NotAuthenticated(message)
            }
            StoreError::Jwt(e) => PortalError::NotAuthenticated(e.to_string()),
            StoreError::CertificateLimit(_) => PortalError::CertificateLimitReached,
            StoreError::ApiError { status, message } => PortalError::Api { status, message },
            StoreError::Unsupported(message) => PortalError::Unsupported(message),
            StoreError::Http(e) => PortalError::Transport(e.to_string()),
            other => PortalError::Transport(other.to_string()),
        }
    }
}
