//! Error types for credential operations

use std::path::PathBuf;
use thiserror::Error;

use crate::portal::PortalError;
use crate::prompt::PromptError;
use crate::remote::RemoteError;

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, CredentialsError>;

/// Credential-related errors
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Credentials would have to be generated, which only happens interactively
    #[error("{what} are not set up for {target}. Run this command again in interactive mode to set them up")]
    NonInteractiveSetupRequired { what: String, target: String },

    /// A prerequisite has not been established yet
    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    /// The developer portal refuses to issue more certificates
    #[error("The Apple Developer Portal will not issue more distribution certificates. Revoke an existing certificate, or run interactively to pick certificates to revoke")]
    CertificateLimitReached,

    /// The local credentials file failed validation
    #[error("Invalid credentials file {path}: {message}")]
    InvalidCredentialsFile { path: PathBuf, message: String },

    /// A declared build target has no entry in the credentials file
    #[error("Credentials file {path} has no entry for build target '{target}'")]
    MissingTarget { path: PathBuf, target: String },

    /// Local and remote credentials cannot be reconciled automatically
    #[error("Cannot reconcile credentials: {0}")]
    Inconsistent(String),

    /// Nothing to operate on
    #[error("{0}")]
    NotFound(String),

    /// Remote credential store error
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Developer portal error
    #[error(transparent)]
    Portal(#[from] PortalError),

    /// Prompt error
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// keytool failed
    #[error("keytool failed: {0}")]
    Keytool(String),

    /// Provisioning profile could not be read
    #[error("Invalid provisioning profile: {0}")]
    InvalidProfile(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("Invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl CredentialsError {
    pub(crate) fn non_interactive(what: impl Into<String>, target: impl ToString) -> Self {
        Self::NonInteractiveSetupRequired {
            what: what.into(),
            target: target.to_string(),
        }
    }

    /// Whether this error is a validation failure of local input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentialsFile { .. } | Self::MissingTarget { .. }
        )
    }
}
