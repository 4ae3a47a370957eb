//! Credentials command - interactive management and listing

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use keysmith_credentials::validators::is_distribution_certificate_valid;
use keysmith_credentials::validators::valid_serial_numbers;
use keysmith_credentials::{AccountSnapshot, Action, Context, DistributionType};
use serde::Serialize;

use super::run_action;
use crate::cli::output;
use crate::cli::project::Project;
use crate::cli::Cli;

/// Manage the project's credentials
#[derive(Debug, Args)]
pub struct CredentialsCommand {
    #[command(subcommand)]
    pub command: Option<CredentialsSubcommand>,
}

/// Credentials subcommands
#[derive(Debug, Subcommand)]
pub enum CredentialsSubcommand {
    /// Show every credential of the account
    List,
}

impl CredentialsCommand {
    pub async fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let project = Project::load()?;
        let mut ctx = project.context(cli)?;

        match self.command {
            Some(CredentialsSubcommand::List) if cli.json => list_json(&mut ctx, &project).await,
            Some(CredentialsSubcommand::List) => {
                let action = Action::DisplayCredentials {
                    account: project.account().to_string(),
                };
                run_action(&mut ctx, action).await.map(drop)
            }
            None => {
                if cli.json {
                    anyhow::bail!(
                        "the credentials menu is interactive; use `keysmith credentials list --json`"
                    );
                }
                let action = Action::ManageCredentials {
                    account: project.account().to_string(),
                    ios_targets: project.ios_targets(),
                    android_app: project.android_app(),
                    credentials_path: project.credentials_path(),
                };
                run_action(&mut ctx, action).await.map(drop)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct CredentialsListing {
    account: String,
    apps: Vec<AppListing>,
    distribution_certificates: Vec<CertificateListing>,
    push_keys: Vec<PushKeyListing>,
}

#[derive(Debug, Serialize)]
struct AppListing {
    project: String,
    bundle_identifier: String,
    parent_bundle_identifier: Option<String>,
    build_credentials: Vec<BuildListing>,
    keystore_alias: Option<String>,
    push_key_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct BuildListing {
    distribution_type: DistributionType,
    distribution_certificate_id: Option<String>,
    provisioning_profile_id: Option<String>,
    profile_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CertificateListing {
    id: String,
    serial_number: Option<String>,
    team_identifier: Option<String>,
    valid_until: Option<DateTime<Utc>>,
    /// `None` when the developer portal could not be reached
    valid: Option<bool>,
}

#[derive(Debug, Serialize)]
struct PushKeyListing {
    id: String,
    key_identifier: String,
}

async fn list_json(ctx: &mut Context, project: &Project) -> anyhow::Result<()> {
    let snapshot = ctx.cache.get_all(project.account()).await?;
    let serials = match ctx.try_portal_session().await {
        Some(session) => valid_serial_numbers(ctx.portal().as_ref(), &session).await.ok(),
        None => None,
    };
    output::json(&listing(project.account(), &snapshot, serials.as_ref(), Utc::now()))
}

/// Summary of an account's credentials without secret material
fn listing(
    account: &str,
    snapshot: &AccountSnapshot,
    valid_serials: Option<&HashSet<String>>,
    now: DateTime<Utc>,
) -> CredentialsListing {
    let apps = snapshot
        .app_credentials
        .iter()
        .map(|app| AppListing {
            project: app.project_full_name.clone(),
            bundle_identifier: app.bundle_identifier.clone(),
            parent_bundle_identifier: app.parent_bundle_identifier.clone(),
            build_credentials: app
                .build_credentials
                .values()
                .map(|build| {
                    let profile = build.provisioning_profile.as_ref();
                    BuildListing {
                        distribution_type: build.distribution_type,
                        distribution_certificate_id: build.distribution_certificate_id.clone(),
                        provisioning_profile_id: profile.map(|p| p.id.clone()),
                        profile_expires_at: profile.and_then(|p| p.expires_at),
                    }
                })
                .collect(),
            keystore_alias: app.keystore.as_ref().map(|k| k.key_alias.clone()),
            push_key_id: app.push_key_id.clone(),
        })
        .collect();

    let distribution_certificates = snapshot
        .distribution_certificates()
        .into_iter()
        .map(|certificate| CertificateListing {
            valid: valid_serials
                .map(|serials| is_distribution_certificate_valid(&certificate, serials, now)),
            id: certificate.id,
            serial_number: certificate.serial_number,
            team_identifier: certificate.apple_team.map(|t| t.team_identifier),
            valid_until: certificate.valid_until,
        })
        .collect();

    let push_keys = snapshot
        .push_keys()
        .into_iter()
        .map(|key| PushKeyListing {
            id: key.id,
            key_identifier: key.key_identifier,
        })
        .collect();

    CredentialsListing {
        account: account.to_string(),
        apps,
        distribution_certificates,
        push_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use keysmith_credentials::types::{DistributionCertificate, UserCredential};

    fn certificate(serial: &str) -> DistributionCertificate {
        DistributionCertificate {
            id: format!("cert-{serial}"),
            certificate_p12: "c2VjcmV0".to_string(),
            certificate_password: "hunter2".to_string(),
            serial_number: Some(serial.to_string()),
            apple_team: None,
            valid_from: None,
            valid_until: None,
            developer_portal_identifier: None,
            assigned_apps: Vec::new(),
        }
    }

    #[test]
    fn test_empty_listing() {
        let listing = listing("acme", &AccountSnapshot::default(), None, Utc::now());
        let json = serde_json::to_value(&listing).unwrap();

        assert_eq!(json["account"], "acme");
        assert_eq!(json["apps"].as_array().unwrap().len(), 0);
        assert_eq!(json["distribution_certificates"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_listing_reports_validity_without_secrets() {
        let snapshot = AccountSnapshot {
            app_credentials: Vec::new(),
            user_credentials: vec![
                Arc::new(UserCredential::DistributionCertificate(certificate("AAA"))),
                Arc::new(UserCredential::DistributionCertificate(certificate("BBB"))),
            ],
        };
        let serials: HashSet<String> = ["AAA".to_string()].into_iter().collect();

        let listing = listing("acme", &snapshot, Some(&serials), Utc::now());
        assert_eq!(listing.distribution_certificates[0].valid, Some(true));
        assert_eq!(listing.distribution_certificates[1].valid, Some(false));

        let json = serde_json::to_string(&listing).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("c2VjcmV0"));

        let unknown = super::listing("acme", &snapshot, None, Utc::now());
        assert_eq!(unknown.distribution_certificates[0].valid, None);
    }
}
