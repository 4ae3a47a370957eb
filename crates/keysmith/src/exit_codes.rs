//! Exit codes for the CLI

use keysmith_core::{ConfigError, CoreError};
use keysmith_credentials::{CredentialsError, PromptError};
use keysmith_stores::StoreError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Validation error
pub const VALIDATION_ERROR: i32 = 5;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Exit code for a failed command, from the first error in the chain that
/// has a category
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain().find_map(category).unwrap_or(ERROR)
}

fn category(err: &(dyn std::error::Error + 'static)) -> Option<i32> {
    if err.is::<ConfigError>() {
        return Some(CONFIG_ERROR);
    }
    if let Some(core) = err.downcast_ref::<CoreError>() {
        return matches!(core, CoreError::Config(_)).then_some(CONFIG_ERROR);
    }
    if let Some(StoreError::ConfigurationError(_)) = err.downcast_ref::<StoreError>() {
        return Some(CONFIG_ERROR);
    }
    if let Some(PromptError::Interrupted) = err.downcast_ref::<PromptError>() {
        return Some(CANCELLED);
    }
    match err.downcast_ref::<CredentialsError>()? {
        CredentialsError::InvalidCredentialsFile { .. }
        | CredentialsError::MissingTarget { .. } => Some(VALIDATION_ERROR),
        CredentialsError::Prompt(PromptError::Interrupted) => Some(CANCELLED),
        _ => None,
    }
}
