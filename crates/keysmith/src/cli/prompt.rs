//! Terminal prompts backed by dialoguer

use async_trait::async_trait;
use console::style;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use keysmith_credentials::{PromptError, PromptResult, Prompter};

/// Terminal prompter.
///
/// dialoguer blocks on stdin, so every prompt runs on the blocking pool.
/// Messages go to stderr to keep stdout clean for `--json`. In
/// non-interactive runs prompts fail but messages are still shown.
#[derive(Debug, Clone, Copy)]
pub struct DialoguerPrompter {
    interactive: bool,
}

impl DialoguerPrompter {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    fn ensure_interactive(&self, message: &str) -> PromptResult<()> {
        if self.interactive {
            Ok(())
        } else {
            Err(PromptError::NonInteractive(message.to_string()))
        }
    }
}

fn prompt_error(err: dialoguer::Error) -> PromptError {
    match err {
        dialoguer::Error::IO(e) if e.kind() == std::io::ErrorKind::Interrupted => {
            PromptError::Interrupted
        }
        dialoguer::Error::IO(e) => PromptError::Io(e.to_string()),
    }
}

async fn blocking<T, F>(f: F) -> PromptResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, dialoguer::Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PromptError::Io(e.to_string()))?
        .map_err(prompt_error)
}

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn text(&self, message: &str, default: Option<&str>) -> PromptResult<String> {
        self.ensure_interactive(message)?;
        let message = message.to_string();
        let default = default.map(str::to_string);
        blocking(move || {
            let mut input = Input::<String>::new().with_prompt(message);
            if let Some(default) = default {
                input = input.default(default);
            }
            input.interact_text()
        })
        .await
    }

    async fn password(&self, message: &str) -> PromptResult<String> {
        self.ensure_interactive(message)?;
        let message = message.to_string();
        blocking(move || Password::new().with_prompt(message).interact()).await
    }

    async fn select(&self, message: &str, items: &[String], default: usize) -> PromptResult<usize> {
        self.ensure_interactive(message)?;
        let message = message.to_string();
        let items = items.to_vec();
        blocking(move || {
            Select::new()
                .with_prompt(message)
                .items(&items)
                .default(default)
                .interact()
        })
        .await
    }

    async fn multi_select(
        &self,
        message: &str,
        items: &[String],
        defaults: &[bool],
    ) -> PromptResult<Vec<usize>> {
        self.ensure_interactive(message)?;
        let message = message.to_string();
        let items = items.to_vec();
        let defaults = defaults.to_vec();
        blocking(move || {
            MultiSelect::new()
                .with_prompt(message)
                .items(&items)
                .defaults(&defaults)
                .interact()
        })
        .await
    }

    async fn confirm(&self, message: &str, default: bool) -> PromptResult<bool> {
        self.ensure_interactive(message)?;
        let message = message.to_string();
        blocking(move || Confirm::new().with_prompt(message).default(default).interact()).await
    }

    fn note(&self, message: &str) {
        tracing::debug!(note = message, "prompt note");
        eprintln!("{} {}", style("→").blue(), message);
    }

    fn warn(&self, message: &str) {
        tracing::debug!(warning = message, "prompt warning");
        eprintln!("{} {}", style("!").yellow().bold(), message);
    }
}
