//! Workflow steps run by the [`ActionRunner`](crate::runner::ActionRunner)

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::Context;
use crate::error::{CredentialsError, Result};
use crate::resolver::{
    generate_distribution_certificate, resolve_build_credentials, resolve_keystore,
};
use crate::runner::{ActionRunner, RunOutcome};
use crate::sync::{
    sync_android_from_file, sync_android_to_file, sync_ios_from_file, sync_ios_to_file,
};
use crate::types::{AppLookupParams, BuildTarget, DistributionType, PushKeyInput};
use crate::validators::{is_distribution_certificate_valid, valid_serial_numbers};

/// Platform and targets a sync operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    Ios {
        targets: Vec<BuildTarget>,
        distribution: DistributionType,
    },
    Android {
        app: AppLookupParams,
    },
}

/// A unit of work. Each variant carries only what it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Set up credentials of one distribution type for every build target
    SetupBuildCredentials {
        targets: Vec<BuildTarget>,
        distribution: DistributionType,
    },
    SetupAppStoreCredentials { app: AppLookupParams },
    SetupAdHocCredentials { app: AppLookupParams },
    SetupEnterpriseCredentials { app: AppLookupParams },
    SetupDevelopmentCredentials { app: AppLookupParams },
    SetupAndroidKeystore { app: AppLookupParams },
    CreateDistributionCertificate { account: String },
    /// Without an id the user picks the certificate
    RemoveDistributionCertificate {
        account: String,
        certificate_id: Option<String>,
    },
    RemoveProvisioningProfile {
        app: AppLookupParams,
        distribution: DistributionType,
    },
    CreatePushKey { account: String },
    RemovePushKey {
        account: String,
        push_key_id: Option<String>,
    },
    RemoveKeystore { app: AppLookupParams },
    SyncFromFile {
        target: SyncTarget,
        credentials_path: PathBuf,
    },
    SyncToFile {
        target: SyncTarget,
        credentials_path: PathBuf,
    },
    DisplayCredentials { account: String },
    /// Interactive menu over the other actions
    ManageCredentials {
        account: String,
        ios_targets: Vec<BuildTarget>,
        android_app: Option<AppLookupParams>,
        credentials_path: PathBuf,
    },
}

impl Action {
    /// The setup action for one app and distribution type
    pub fn setup_for(distribution: DistributionType, app: AppLookupParams) -> Self {
        match distribution {
            DistributionType::AppStore => Self::SetupAppStoreCredentials { app },
            DistributionType::AdHoc => Self::SetupAdHocCredentials { app },
            DistributionType::Enterprise => Self::SetupEnterpriseCredentials { app },
            DistributionType::Development => Self::SetupDevelopmentCredentials { app },
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetupBuildCredentials { .. } => "setup-build-credentials",
            Self::SetupAppStoreCredentials { .. } => "setup-app-store-credentials",
            Self::SetupAdHocCredentials { .. } => "setup-ad-hoc-credentials",
            Self::SetupEnterpriseCredentials { .. } => "setup-enterprise-credentials",
            Self::SetupDevelopmentCredentials { .. } => "setup-development-credentials",
            Self::SetupAndroidKeystore { .. } => "setup-android-keystore",
            Self::CreateDistributionCertificate { .. } => "create-distribution-certificate",
            Self::RemoveDistributionCertificate { .. } => "remove-distribution-certificate",
            Self::RemoveProvisioningProfile { .. } => "remove-provisioning-profile",
            Self::CreatePushKey { .. } => "create-push-key",
            Self::RemovePushKey { .. } => "remove-push-key",
            Self::RemoveKeystore { .. } => "remove-keystore",
            Self::SyncFromFile { .. } => "sync-from-file",
            Self::SyncToFile { .. } => "sync-to-file",
            Self::DisplayCredentials { .. } => "display-credentials",
            Self::ManageCredentials { .. } => "manage-credentials",
        }
    }
}

/// Result of running one action
#[derive(Debug)]
pub enum ActionOutcome {
    Completed,
    /// The user chose to stop; not an error
    Cancelled,
    Failed(CredentialsError),
}

impl From<Result<ActionOutcome>> for ActionOutcome {
    fn from(result: Result<ActionOutcome>) -> Self {
        result.unwrap_or_else(ActionOutcome::Failed)
    }
}

fn require_interactive(ctx: &Context, what: &str, target: &str) -> Result<()> {
    if ctx.is_interactive() {
        Ok(())
    } else {
        Err(CredentialsError::non_interactive(what, target))
    }
}

pub(crate) fn setup_build_credentials(
    runner: &mut ActionRunner,
    targets: Vec<BuildTarget>,
    distribution: DistributionType,
) -> Result<ActionOutcome> {
    // pushed in reverse so targets run in declaration order
    for target in targets.into_iter().rev() {
        runner.push_next(Action::setup_for(distribution, target.app));
    }
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn setup_ios(
    ctx: &mut Context,
    app: AppLookupParams,
    distribution: DistributionType,
) -> Result<ActionOutcome> {
    resolve_build_credentials(ctx, &app, distribution).await?;
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn setup_android_keystore(
    ctx: &mut Context,
    app: AppLookupParams,
) -> Result<ActionOutcome> {
    resolve_keystore(ctx, &app).await?;
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn create_distribution_certificate(
    ctx: &mut Context,
    account: String,
) -> Result<ActionOutcome> {
    require_interactive(ctx, "A new distribution certificate", &account)?;
    let session = ctx.portal_session().await?;
    let team = ctx
        .cache
        .create_or_get_apple_team(&account, &session.team)
        .await?;
    generate_distribution_certificate(ctx, &account, &session, &team).await?;
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn remove_distribution_certificate(
    ctx: &mut Context,
    account: String,
    certificate_id: Option<String>,
) -> Result<ActionOutcome> {
    let certificates = ctx.cache.distribution_certificates(&account).await?;
    let certificate = match certificate_id {
        Some(id) => certificates
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| {
                CredentialsError::NotFound(format!("no distribution certificate {id}"))
            })?,
        None => {
            if certificates.is_empty() {
                ctx.prompter().note("There are no distribution certificates");
                return Ok(ActionOutcome::Completed);
            }
            require_interactive(ctx, "Choosing a certificate to remove", &account)?;
            let items: Vec<String> = certificates.iter().map(|c| c.describe()).collect();
            let choice = ctx
                .prompter()
                .select("Select the certificate to remove", &items, 0)
                .await?;
            certificates
                .into_iter()
                .nth(choice)
                .ok_or_else(|| CredentialsError::NotFound("selected certificate".to_string()))?
        }
    };

    if ctx.is_interactive() {
        let confirmed = ctx
            .prompter()
            .confirm(
                &format!(
                    "Remove {}? Provisioning profiles generated for it are removed as well",
                    certificate.describe()
                ),
                false,
            )
            .await?;
        if !confirmed {
            return Ok(ActionOutcome::Cancelled);
        }

        if let Some(portal_id) = certificate.developer_portal_identifier.clone() {
            let revoke = ctx
                .prompter()
                .confirm("Also revoke it on the Apple Developer Portal?", false)
                .await?;
            if revoke {
                let session = ctx.portal_session().await?;
                ctx.portal()
                    .revoke_distribution_certificates(&session, &[portal_id])
                    .await?;
            }
        }
    }

    ctx.cache
        .delete_distribution_certificate(&account, &certificate.id)
        .await?;
    ctx.prompter()
        .note(&format!("Removed distribution certificate {}", certificate.describe()));
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn remove_provisioning_profile(
    ctx: &mut Context,
    app: AppLookupParams,
    distribution: DistributionType,
) -> Result<ActionOutcome> {
    let profile = ctx
        .cache
        .build_credentials(&app, distribution)
        .await?
        .and_then(|b| b.provisioning_profile)
        .ok_or_else(|| {
            CredentialsError::NotFound(format!("no {distribution} provisioning profile for {app}"))
        })?;

    if ctx.is_interactive() {
        let confirmed = ctx
            .prompter()
            .confirm(
                &format!(
                    "Remove the {distribution} provisioning profile of {}?",
                    app.bundle_identifier
                ),
                false,
            )
            .await?;
        if !confirmed {
            return Ok(ActionOutcome::Cancelled);
        }
        if let Some(portal_id) = profile.developer_portal_identifier.as_deref() {
            let revoke = ctx
                .prompter()
                .confirm("Also revoke it on the Apple Developer Portal?", false)
                .await?;
            if revoke {
                let session = ctx.portal_session().await?;
                ctx.portal()
                    .revoke_provisioning_profile(&session, portal_id)
                    .await?;
            }
        }
    }

    ctx.cache.delete_provisioning_profile(&app, &profile.id).await?;
    ctx.prompter().note("Removed provisioning profile");
    Ok(ActionOutcome::Completed)
}

/// Apple names downloaded keys `AuthKey_<KEY ID>.p8`
fn key_id_from_file_name(path: &str) -> Option<String> {
    let name = Path::new(path).file_name()?.to_str()?;
    let id = name.strip_prefix("AuthKey_")?.strip_suffix(".p8")?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())).then(|| id.to_string())
}

pub(crate) async fn create_push_key(ctx: &mut Context, account: String) -> Result<ActionOutcome> {
    require_interactive(ctx, "A push key", &account)?;
    let path = ctx
        .prompter()
        .text("Path to the .p8 push key file", None)
        .await?;
    let path = path.trim().to_string();
    let key_p8 = tokio::fs::read_to_string(crate::credentials_file::resolve_path(
        &ctx.project_dir,
        &path,
    ))
    .await?;
    let default_id = key_id_from_file_name(&path);
    let key_identifier = ctx
        .prompter()
        .text("Key ID", default_id.as_deref())
        .await?;

    let apple_team_id = match ctx.try_portal_session().await {
        Some(session) => Some(
            ctx.cache
                .create_or_get_apple_team(&account, &session.team)
                .await?
                .id,
        ),
        None => None,
    };
    let key = ctx
        .cache
        .create_push_key(
            &account,
            &PushKeyInput {
                key_identifier: key_identifier.trim().to_string(),
                key_p8,
                apple_team_id,
            },
        )
        .await?;
    ctx.prompter()
        .note(&format!("Uploaded push key {}", key.key_identifier));
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn remove_push_key(
    ctx: &mut Context,
    account: String,
    push_key_id: Option<String>,
) -> Result<ActionOutcome> {
    let keys = ctx.cache.push_keys(&account).await?;
    let key = match push_key_id {
        Some(id) => keys
            .into_iter()
            .find(|k| k.id == id)
            .ok_or_else(|| CredentialsError::NotFound(format!("no push key {id}")))?,
        None => {
            if keys.is_empty() {
                ctx.prompter().note("There are no push keys");
                return Ok(ActionOutcome::Completed);
            }
            require_interactive(ctx, "Choosing a push key to remove", &account)?;
            let items: Vec<String> = keys.iter().map(|k| k.key_identifier.clone()).collect();
            let choice = ctx
                .prompter()
                .select("Select the push key to remove", &items, 0)
                .await?;
            keys.into_iter()
                .nth(choice)
                .ok_or_else(|| CredentialsError::NotFound("selected push key".to_string()))?
        }
    };

    if ctx.is_interactive()
        && !ctx
            .prompter()
            .confirm(&format!("Remove push key {}?", key.key_identifier), false)
            .await?
    {
        return Ok(ActionOutcome::Cancelled);
    }
    ctx.cache.delete_push_key(&account, &key.id).await?;
    ctx.prompter()
        .note(&format!("Removed push key {}", key.key_identifier));
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn remove_keystore(
    ctx: &mut Context,
    app: AppLookupParams,
) -> Result<ActionOutcome> {
    if ctx.cache.keystore(&app).await?.is_none() {
        ctx.prompter()
            .note(&format!("There is no keystore for {}", app.bundle_identifier));
        return Ok(ActionOutcome::Completed);
    }

    if ctx.is_interactive() {
        let confirmed = ctx
            .prompter()
            .confirm(
                "Remove the keystore? Without it, updates to the app can no longer be signed with the same key",
                false,
            )
            .await?;
        if !confirmed {
            return Ok(ActionOutcome::Cancelled);
        }
    }
    ctx.cache.delete_keystore(&app).await?;
    ctx.prompter().note("Removed keystore");
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn sync_from_file(
    ctx: &mut Context,
    target: SyncTarget,
    credentials_path: PathBuf,
) -> Result<ActionOutcome> {
    match target {
        SyncTarget::Ios {
            targets,
            distribution,
        } => {
            let results = sync_ios_from_file(ctx, &targets, distribution, &credentials_path).await?;
            for result in results {
                let status = if result.certificate_uploaded || result.profile_uploaded {
                    "uploaded"
                } else {
                    "already up to date"
                };
                ctx.prompter()
                    .note(&format!("{}: {}", result.target_name, status));
            }
        }
        SyncTarget::Android { app } => {
            let uploaded = sync_android_from_file(ctx, &app, &credentials_path).await?;
            ctx.prompter().note(if uploaded {
                "Keystore uploaded"
            } else {
                "Keystore already up to date"
            });
        }
    }
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn sync_to_file(
    ctx: &mut Context,
    target: SyncTarget,
    credentials_path: PathBuf,
) -> Result<ActionOutcome> {
    match target {
        SyncTarget::Ios {
            targets,
            distribution,
        } => {
            sync_ios_to_file(ctx, &targets, distribution, &credentials_path).await?;
        }
        SyncTarget::Android { app } => {
            sync_android_to_file(ctx, &app, &credentials_path).await?;
        }
    }
    Ok(ActionOutcome::Completed)
}

pub(crate) async fn display_credentials(
    ctx: &mut Context,
    account: String,
) -> Result<ActionOutcome> {
    let snapshot = ctx.cache.get_all(&account).await?;
    let serials = match ctx.try_portal_session().await {
        Some(session) => valid_serial_numbers(ctx.portal().as_ref(), &session).await.ok(),
        None => None,
    };
    let now = chrono::Utc::now();
    let prompter = ctx.prompter();

    if snapshot.app_credentials.is_empty() && snapshot.user_credentials.is_empty() {
        prompter.note(&format!("No credentials for @{account}"));
        return Ok(ActionOutcome::Completed);
    }

    for app in &snapshot.app_credentials {
        prompter.note(&format!("{} {}", app.project_full_name, app.bundle_identifier));
        for (distribution, build) in &app.build_credentials {
            let profile = build
                .provisioning_profile
                .as_ref()
                .map(|p| {
                    let expiry = p
                        .expires_at
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    format!("profile {} (expires {})", p.id, expiry)
                })
                .unwrap_or_else(|| "no profile".to_string());
            prompter.note(&format!(
                "  {}: certificate {}, {}",
                distribution,
                build.distribution_certificate_id.as_deref().unwrap_or("none"),
                profile
            ));
        }
        if let Some(keystore) = &app.keystore {
            prompter.note(&format!("  keystore: alias {}", keystore.key_alias));
        }
        if let Some(push_key) = &app.push_key_id {
            prompter.note(&format!("  push key: {push_key}"));
        }
    }

    for certificate in snapshot.distribution_certificates() {
        let validity = match &serials {
            Some(serials) if is_distribution_certificate_valid(&certificate, serials, now) => {
                "valid"
            }
            Some(_) => "invalid",
            None => "validity unknown",
        };
        prompter.note(&format!(
            "Distribution certificate {}: {} [{}]",
            certificate.id,
            certificate.describe(),
            validity
        ));
    }
    for key in snapshot.push_keys() {
        prompter.note(&format!("Push key {}: {}", key.id, key.key_identifier));
    }
    Ok(ActionOutcome::Completed)
}

const DISTRIBUTIONS: [DistributionType; 4] = [
    DistributionType::AppStore,
    DistributionType::AdHoc,
    DistributionType::Enterprise,
    DistributionType::Development,
];

async fn select_distribution(ctx: &Context) -> Result<DistributionType> {
    let items: Vec<String> = DISTRIBUTIONS.iter().map(|d| d.to_string()).collect();
    let choice = ctx
        .prompter()
        .select("Select the distribution type", &items, 0)
        .await?;
    Ok(DISTRIBUTIONS[choice.min(DISTRIBUTIONS.len() - 1)])
}

async fn select_sync_target(
    ctx: &Context,
    ios_targets: &[BuildTarget],
    android_app: Option<&AppLookupParams>,
) -> Result<SyncTarget> {
    match (ios_targets.is_empty(), android_app) {
        (false, None) => Ok(SyncTarget::Ios {
            targets: ios_targets.to_vec(),
            distribution: select_distribution(ctx).await?,
        }),
        (true, Some(app)) => Ok(SyncTarget::Android { app: app.clone() }),
        (false, Some(app)) => {
            let items = vec!["iOS".to_string(), "Android".to_string()];
            if ctx.prompter().select("Select the platform", &items, 0).await? == 0 {
                Ok(SyncTarget::Ios {
                    targets: ios_targets.to_vec(),
                    distribution: select_distribution(ctx).await?,
                })
            } else {
                Ok(SyncTarget::Android { app: app.clone() })
            }
        }
        (true, None) => Err(CredentialsError::MissingPrerequisite(
            "the project configures neither iOS nor Android".to_string(),
        )),
    }
}

enum MenuEntry {
    SetupIos,
    SetupAndroid,
    CreateCertificate,
    RemoveCertificate,
    RemoveProfile,
    CreatePushKey,
    RemovePushKey,
    RemoveKeystore,
    SyncFromFile,
    SyncToFile,
    Display,
    Exit,
}

pub(crate) async fn manage_credentials(
    runner: &mut ActionRunner,
    ctx: &mut Context,
    menu: Action,
) -> Result<ActionOutcome> {
    let Action::ManageCredentials {
        account,
        ios_targets,
        android_app,
        credentials_path,
    } = &menu
    else {
        return Err(CredentialsError::Inconsistent(format!(
            "{} is not a menu",
            menu.name()
        )));
    };
    require_interactive(ctx, "The credentials menu", account)?;

    let has_ios = !ios_targets.is_empty();
    let has_android = android_app.is_some();
    let mut entries = Vec::new();
    if has_ios {
        entries.push(("Set up iOS build credentials", MenuEntry::SetupIos));
    }
    if has_android {
        entries.push(("Set up the Android keystore", MenuEntry::SetupAndroid));
    }
    if has_ios {
        entries.push(("Add a distribution certificate", MenuEntry::CreateCertificate));
        entries.push(("Remove a distribution certificate", MenuEntry::RemoveCertificate));
        entries.push(("Remove a provisioning profile", MenuEntry::RemoveProfile));
        entries.push(("Upload a push key", MenuEntry::CreatePushKey));
        entries.push(("Remove a push key", MenuEntry::RemovePushKey));
    }
    if has_android {
        entries.push(("Remove the Android keystore", MenuEntry::RemoveKeystore));
    }
    entries.push(("Upload credentials from the credentials file", MenuEntry::SyncFromFile));
    entries.push(("Download credentials to the credentials file", MenuEntry::SyncToFile));
    entries.push(("Show credentials", MenuEntry::Display));
    entries.push(("Exit", MenuEntry::Exit));

    let items: Vec<String> = entries.iter().map(|(label, _)| label.to_string()).collect();
    let choice = ctx
        .prompter()
        .select("What do you want to do?", &items, 0)
        .await?;
    let Some((_, entry)) = entries.get(choice) else {
        return Ok(ActionOutcome::Cancelled);
    };

    let next = match entry {
        MenuEntry::Exit => return Ok(ActionOutcome::Cancelled),
        MenuEntry::SetupIos => Action::SetupBuildCredentials {
            targets: ios_targets.clone(),
            distribution: select_distribution(ctx).await?,
        },
        MenuEntry::SetupAndroid | MenuEntry::RemoveKeystore => {
            let app = android_app.clone().ok_or_else(|| {
                CredentialsError::MissingPrerequisite("no Android package configured".to_string())
            })?;
            if matches!(entry, MenuEntry::SetupAndroid) {
                Action::SetupAndroidKeystore { app }
            } else {
                Action::RemoveKeystore { app }
            }
        }
        MenuEntry::CreateCertificate => Action::CreateDistributionCertificate {
            account: account.clone(),
        },
        MenuEntry::RemoveCertificate => Action::RemoveDistributionCertificate {
            account: account.clone(),
            certificate_id: None,
        },
        MenuEntry::RemoveProfile => {
            let index = if ios_targets.len() == 1 {
                0
            } else {
                let names: Vec<String> =
                    ios_targets.iter().map(|t| t.target_name.clone()).collect();
                ctx.prompter()
                    .select("Select the build target", &names, 0)
                    .await?
            };
            let target = ios_targets.get(index).ok_or_else(|| {
                CredentialsError::NotFound("selected build target".to_string())
            })?;
            Action::RemoveProvisioningProfile {
                app: target.app.clone(),
                distribution: select_distribution(ctx).await?,
            }
        }
        MenuEntry::CreatePushKey => Action::CreatePushKey {
            account: account.clone(),
        },
        MenuEntry::RemovePushKey => Action::RemovePushKey {
            account: account.clone(),
            push_key_id: None,
        },
        MenuEntry::SyncFromFile => Action::SyncFromFile {
            target: select_sync_target(ctx, ios_targets, android_app.as_ref()).await?,
            credentials_path: credentials_path.clone(),
        },
        MenuEntry::SyncToFile => Action::SyncToFile {
            target: select_sync_target(ctx, ios_targets, android_app.as_ref()).await?,
            credentials_path: credentials_path.clone(),
        },
        MenuEntry::Display => Action::DisplayCredentials {
            account: account.clone(),
        },
    };

    debug!(action = next.name(), "running menu selection");
    if ActionRunner::run_nested(next, ctx).await? == RunOutcome::Cancelled {
        debug!("menu selection cancelled");
    }
    runner.push_next(menu);
    Ok(ActionOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_id_from_file_name() {
        assert_eq!(
            key_id_from_file_name("keys/AuthKey_ABC123XYZ.p8").as_deref(),
            Some("ABC123XYZ")
        );
        assert_eq!(key_id_from_file_name("push.p8"), None);
    }

    #[test]
    fn test_setup_for_distribution() {
        let app = AppLookupParams::new("acct", "app", "com.acct.app");
        assert_eq!(
            Action::setup_for(DistributionType::Enterprise, app.clone()),
            Action::SetupEnterpriseCredentials { app }
        );
    }
}
