//! Build-credentials command - make sure a build can be signed

use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use keysmith_credentials::{Action, Context, DistributionType, RunOutcome};
use serde::Serialize;

use super::{run_action, DistributionArg, Platform};
use crate::cli::output;
use crate::cli::project::Project;
use crate::cli::Cli;

/// Resolve (and, interactively, create) the credentials a build needs
#[derive(Debug, Args)]
pub struct BuildCredentialsCommand {
    /// Platform to build for
    #[arg(short, long)]
    pub platform: Platform,

    /// iOS distribution type
    #[arg(short, long, default_value = "app-store")]
    pub distribution: DistributionArg,
}

#[derive(Debug, Serialize)]
struct IosTargetSummary {
    target: String,
    bundle_identifier: String,
    distribution_type: DistributionType,
    distribution_certificate_id: Option<String>,
    provisioning_profile_id: Option<String>,
    profile_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct KeystoreSummary {
    package: String,
    key_alias: String,
}

impl BuildCredentialsCommand {
    pub async fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let project = Project::load()?;
        let mut ctx = project.context(cli)?;

        match self.platform {
            Platform::Ios => self.ios(cli, &project, &mut ctx).await,
            Platform::Android => android(cli, &project, &mut ctx).await,
        }
    }

    async fn ios(&self, cli: &Cli, project: &Project, ctx: &mut Context) -> anyhow::Result<()> {
        let targets = project.ios_targets();
        if targets.is_empty() {
            anyhow::bail!("no [ios] section in the project configuration");
        }
        let distribution = DistributionType::from(self.distribution);

        let action = Action::SetupBuildCredentials {
            targets: targets.clone(),
            distribution,
        };
        if run_action(ctx, action).await? == RunOutcome::Cancelled {
            return Ok(());
        }

        // Every target was resolved, so the cache holds its build credentials
        let mut summaries = Vec::with_capacity(targets.len());
        for target in &targets {
            let build = ctx.cache.build_credentials(&target.app, distribution).await?;
            let profile = build.as_ref().and_then(|b| b.provisioning_profile.as_ref());
            summaries.push(IosTargetSummary {
                target: target.target_name.clone(),
                bundle_identifier: target.app.bundle_identifier.clone(),
                distribution_type: distribution,
                distribution_certificate_id: build
                    .as_ref()
                    .and_then(|b| b.distribution_certificate_id.clone()),
                provisioning_profile_id: profile.map(|p| p.id.clone()),
                profile_expires_at: profile.and_then(|p| p.expires_at),
            });
        }

        if cli.json {
            return output::json(&summaries);
        }

        output::success(&format!("{} credentials are ready", distribution));
        for summary in &summaries {
            println!();
            println!("{}", output::header(&summary.target));
            println!("{}", output::key_value("Bundle identifier", &summary.bundle_identifier));
            println!(
                "{}",
                output::key_value(
                    "Distribution certificate",
                    summary.distribution_certificate_id.as_deref().unwrap_or("-"),
                )
            );
            println!(
                "{}",
                output::key_value(
                    "Provisioning profile",
                    summary.provisioning_profile_id.as_deref().unwrap_or("-"),
                )
            );
            if let Some(expires) = summary.profile_expires_at {
                let expires = style(expires.format("%Y-%m-%d")).cyan().to_string();
                println!("{}", output::key_value("Profile expires", &expires));
            }
        }
        Ok(())
    }
}

async fn android(cli: &Cli, project: &Project, ctx: &mut Context) -> anyhow::Result<()> {
    let app = project
        .android_app()
        .ok_or_else(|| anyhow::anyhow!("no [android] section in the project configuration"))?;

    let action = Action::SetupAndroidKeystore { app: app.clone() };
    if run_action(ctx, action).await? == RunOutcome::Cancelled {
        return Ok(());
    }

    let keystore = ctx
        .cache
        .keystore(&app)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no keystore stored for {}", app))?;
    let summary = KeystoreSummary {
        package: app.bundle_identifier.clone(),
        key_alias: keystore.key_alias,
    };

    if cli.json {
        return output::json(&summary);
    }

    output::success("Android keystore is ready");
    println!("{}", output::key_value("Package", &summary.package));
    println!("{}", output::key_value("Key alias", &summary.key_alias));
    Ok(())
}
