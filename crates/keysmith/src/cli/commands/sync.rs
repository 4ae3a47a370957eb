//! Sync command - credentials file <-> remote store

use std::path::PathBuf;

use clap::{ArgGroup, Args};
use keysmith_credentials::{Action, RunOutcome, SyncTarget};

use super::{run_action, DistributionArg, Platform};
use crate::cli::output;
use crate::cli::project::Project;
use crate::cli::Cli;

/// Copy credentials between the local credentials file and the remote store
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("direction").required(true).args(["from_file", "to_file"])))]
pub struct SyncCommand {
    /// Upload the credentials file to the remote store
    #[arg(long)]
    pub from_file: bool,

    /// Download remote credentials into the credentials file
    #[arg(long)]
    pub to_file: bool,

    /// Platform to sync
    #[arg(short, long)]
    pub platform: Platform,

    /// iOS distribution type
    #[arg(short, long, default_value = "app-store")]
    pub distribution: DistributionArg,

    /// Credentials file (defaults to the configured one)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl SyncCommand {
    pub async fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let project = Project::load()?;
        let mut ctx = project.context(cli)?;

        let target = match self.platform {
            Platform::Ios => {
                let targets = project.ios_targets();
                if targets.is_empty() {
                    anyhow::bail!("no [ios] section in the project configuration");
                }
                SyncTarget::Ios {
                    targets,
                    distribution: self.distribution.into(),
                }
            }
            Platform::Android => SyncTarget::Android {
                app: project.android_app().ok_or_else(|| {
                    anyhow::anyhow!("no [android] section in the project configuration")
                })?,
            },
        };
        let credentials_path = self
            .file
            .as_ref()
            .map(|f| project.root.join(f))
            .unwrap_or_else(|| project.credentials_path());

        let action = if self.from_file {
            Action::SyncFromFile {
                target,
                credentials_path: credentials_path.clone(),
            }
        } else {
            Action::SyncToFile {
                target,
                credentials_path: credentials_path.clone(),
            }
        };

        if run_action(&mut ctx, action).await? == RunOutcome::Completed {
            if cli.json {
                output::json(&serde_json::json!({
                    "direction": if self.from_file { "from_file" } else { "to_file" },
                    "credentials_file": credentials_path,
                }))?;
            } else if self.from_file {
                output::success("Uploaded credentials from the credentials file");
            } else {
                output::success(&format!("Wrote {}", credentials_path.display()));
            }
        }
        Ok(())
    }
}
