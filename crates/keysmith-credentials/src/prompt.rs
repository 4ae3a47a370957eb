//! Interactive prompt capability

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

/// Prompt errors
#[derive(Debug, Error)]
pub enum PromptError {
    /// A prompt was attempted in non-interactive mode
    #[error("Input is required for '{0}', but prompts are disabled in non-interactive mode")]
    NonInteractive(String),

    /// The user aborted the prompt (Ctrl-C / Esc)
    #[error("Prompt interrupted")]
    Interrupted,

    /// The terminal interaction failed
    #[error("Prompt failed: {0}")]
    Io(String),
}

/// Result type for prompts
pub type PromptResult<T> = std::result::Result<T, PromptError>;

/// Prompting and user-facing messages.
///
/// Every prompt is a suspension point of the run; the run continues once the
/// user answers.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn text(&self, message: &str, default: Option<&str>) -> PromptResult<String>;

    async fn password(&self, message: &str) -> PromptResult<String>;

    /// Returns the index of the selected item
    async fn select(&self, message: &str, items: &[String], default: usize) -> PromptResult<usize>;

    /// Returns the indices of the selected items
    async fn multi_select(
        &self,
        message: &str,
        items: &[String],
        defaults: &[bool],
    ) -> PromptResult<Vec<usize>>;

    async fn confirm(&self, message: &str, default: bool) -> PromptResult<bool>;

    /// Show an informational message
    fn note(&self, message: &str);

    /// Show a warning
    fn warn(&self, message: &str);
}

/// Prompter for non-interactive runs: every prompt fails, messages go to
/// the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

#[async_trait]
impl Prompter for NonInteractivePrompter {
    async fn text(&self, message: &str, _default: Option<&str>) -> PromptResult<String> {
        Err(PromptError::NonInteractive(message.to_string()))
    }

    async fn password(&self, message: &str) -> PromptResult<String> {
        Err(PromptError::NonInteractive(message.to_string()))
    }

    async fn select(
        &self,
        message: &str,
        _items: &[String],
        _default: usize,
    ) -> PromptResult<usize> {
        Err(PromptError::NonInteractive(message.to_string()))
    }

    async fn multi_select(
        &self,
        message: &str,
        _items: &[String],
        _defaults: &[bool],
    ) -> PromptResult<Vec<usize>> {
        Err(PromptError::NonInteractive(message.to_string()))
    }

    async fn confirm(&self, message: &str, _default: bool) -> PromptResult<bool> {
        Err(PromptError::NonInteractive(message.to_string()))
    }

    fn note(&self, message: &str) {
        info!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
    }
}
