//! CLI definition and command handling

pub mod commands;
pub mod output;
mod project;
mod prompt;

use clap::{Parser, Subcommand};

use commands::{BuildCredentialsCommand, CredentialsCommand, SyncCommand};

/// keysmith - code signing credentials for iOS and Android builds
#[derive(Debug, Parser)]
#[command(name = "keysmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Never prompt; fail when credentials would have to be created
    #[arg(long, global = true, env = keysmith_core::config::NON_INTERACTIVE_ENV)]
    pub non_interactive: bool,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage the project's credentials (interactive menu)
    Credentials(CredentialsCommand),

    /// Make sure a build has valid signing credentials
    BuildCredentials(BuildCredentialsCommand),

    /// Copy credentials between the credentials file and the remote store
    Sync(SyncCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            match &self.command {
                Commands::Credentials(cmd) => cmd.execute(&self).await,
                Commands::BuildCredentials(cmd) => cmd.execute(&self).await,
                Commands::Sync(cmd) => cmd.execute(&self).await,
            }
        })
    }

    /// Prompts are allowed: not disabled and a user is at the terminal
    pub fn is_interactive(&self) -> bool {
        !self.non_interactive && console::user_attended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_credentials() {
        let cli = Cli::try_parse_from([
            "keysmith",
            "build-credentials",
            "--platform",
            "ios",
            "--distribution",
            "ad-hoc",
            "--non-interactive",
        ])
        .unwrap();
        assert!(cli.non_interactive);
        assert!(matches!(cli.command, Commands::BuildCredentials(_)));
    }

    #[test]
    fn test_sync_needs_a_direction() {
        let result = Cli::try_parse_from(["keysmith", "sync", "--platform", "android"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "keysmith",
            "sync",
            "--from-file",
            "--to-file",
            "--platform",
            "android",
        ]);
        assert!(result.is_err());
    }
}
