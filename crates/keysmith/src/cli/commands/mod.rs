//! CLI commands

mod build_credentials;
mod credentials;
mod sync;

pub use build_credentials::BuildCredentialsCommand;
pub use credentials::CredentialsCommand;
pub use sync::SyncCommand;

use clap::ValueEnum;
use keysmith_credentials::{Action, ActionRunner, Context, DistributionType, RunOutcome};
use tracing::info;

use crate::cli::output;

/// Target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    Ios,
    Android,
}

/// iOS distribution type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DistributionArg {
    AppStore,
    AdHoc,
    Enterprise,
    Development,
}

impl From<DistributionArg> for DistributionType {
    fn from(d: DistributionArg) -> Self {
        match d {
            DistributionArg::AppStore => Self::AppStore,
            DistributionArg::AdHoc => Self::AdHoc,
            DistributionArg::Enterprise => Self::Enterprise,
            DistributionArg::Development => Self::Development,
        }
    }
}

/// Run one top-level action to completion
async fn run_action(ctx: &mut Context, action: Action) -> anyhow::Result<RunOutcome> {
    let name = action.name();
    let outcome = ActionRunner::new(action).run(ctx).await?;
    info!(action = name, outcome = ?outcome, "run finished");
    if outcome == RunOutcome::Cancelled {
        output::info("Cancelled");
    }
    Ok(outcome)
}
