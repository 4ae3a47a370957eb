//! Synchronization between the local credentials file and the remote store

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::context::Context;
use crate::credentials_file::{
    read_ios_entry, read_keystore_entry, resolve_path, AndroidCredentials, CertificateEntry,
    CredentialsFile, IosCredentials, IosTargetEntry, KeystoreEntry, LocalIosCredentials,
};
use crate::error::{CredentialsError, Result};
use crate::provisioning::parse_provisioning_profile;
use crate::resolver::register_app_identifier;
use crate::types::{
    AppLookupParams, BuildCredentialsInput, BuildTarget, DistributionCertificate,
    DistributionCertificateInput, DistributionType, ProvisioningProfileInput,
};

const IOS_DIR: &str = "credentials/ios";
const ANDROID_KEYSTORE_PATH: &str = "credentials/android/keystore.jks";

/// What an upload did for one build target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSync {
    pub target_name: String,
    pub certificate_uploaded: bool,
    pub profile_uploaded: bool,
}

/// Upload iOS credentials from the credentials file for every build target.
///
/// The file is validated against the targets before anything is sent.
/// Blobs identical to what is already assigned are not uploaded again.
#[instrument(skip_all, fields(distribution = %distribution, targets = targets.len()))]
pub async fn sync_ios_from_file(
    ctx: &mut Context,
    targets: &[BuildTarget],
    distribution: DistributionType,
    credentials_path: &Path,
) -> Result<Vec<TargetSync>> {
    let file = CredentialsFile::load(credentials_path)?;
    let entries = file.ios_entries(credentials_path, targets)?;

    if targets.len() > 1 && !ctx.cache.remote().supports_multi_target() {
        return Err(CredentialsError::Inconsistent(
            "the credential store keeps a single set of iOS credentials per project, \
             but the project has several build targets"
                .to_string(),
        ));
    }

    let mut local = Vec::with_capacity(entries.len());
    for (target, entry) in entries {
        local.push((target, read_ios_entry(&ctx.project_dir, &entry)?));
    }

    let mut results = Vec::with_capacity(local.len());
    for (target, credentials) in local {
        results.push(sync_ios_target(ctx, target, distribution, &credentials).await?);
    }
    Ok(results)
}

async fn sync_ios_target(
    ctx: &mut Context,
    target: &BuildTarget,
    distribution: DistributionType,
    local: &LocalIosCredentials,
) -> Result<TargetSync> {
    let app = &target.app;
    let profile_bytes = local.profile_bytes()?;
    let certificate_bytes = local.certificate_bytes()?;
    let info = parse_provisioning_profile(&profile_bytes)?;
    let local_team = info.team();

    let current = ctx.cache.build_credentials(app, distribution).await?;
    let current_certificate_id = current
        .as_ref()
        .and_then(|b| b.distribution_certificate_id.clone());
    let current_certificate = match current_certificate_id {
        Some(id) => ctx.cache.distribution_certificate(&app.account, &id).await?,
        None => None,
    };
    let current_profile = current.and_then(|b| b.provisioning_profile);
    let previous_profile_id = current_profile.as_ref().map(|p| p.id.clone());

    let same_certificate = current_certificate.filter(|c| same_blob(c, &certificate_bytes));
    let same_profile = same_certificate.as_ref().and_then(|cert| {
        current_profile
            .filter(|p| p.certificate_id.as_deref() == Some(cert.id.as_str()))
            .filter(|p| p.content_bytes().is_ok_and(|bytes| bytes == profile_bytes))
    });
    // a certificate uploaded without a team learns it from the profile
    let team_missing = local_team.is_some()
        && same_certificate
            .as_ref()
            .is_some_and(|c| c.apple_team.is_none());

    if same_certificate.is_some() && same_profile.is_some() && !team_missing {
        debug!(build_target = %target.target_name, "credentials unchanged");
        return Ok(TargetSync {
            target_name: target.target_name.clone(),
            certificate_uploaded: false,
            profile_uploaded: false,
        });
    }

    let team = match &local_team {
        Some(team) => Some(ctx.cache.create_or_get_apple_team(&app.account, team).await?),
        None => None,
    };
    let team_id = team.as_ref().map(|t| t.id.clone());
    register_app_identifier(&mut ctx.cache, app, team.as_ref()).await?;

    let certificate_uploaded = same_certificate.is_none();
    let certificate = match same_certificate {
        Some(cert) if team_missing => {
            debug!(build_target = %target.target_name, "attaching team to certificate");
            ctx.cache
                .update_distribution_certificate(
                    &app.account,
                    &cert.id,
                    &DistributionCertificateInput {
                        certificate_p12: cert.certificate_p12.clone(),
                        certificate_password: cert.certificate_password.clone(),
                        apple_team_id: team_id.clone(),
                        developer_portal_identifier: cert.developer_portal_identifier.clone(),
                    },
                )
                .await?
        }
        Some(cert) => cert,
        None => {
            ctx.cache
                .create_distribution_certificate(
                    &app.account,
                    &DistributionCertificateInput {
                        certificate_p12: local.certificate_p12.clone(),
                        certificate_password: local.certificate_password.clone(),
                        apple_team_id: team_id.clone(),
                        developer_portal_identifier: None,
                    },
                )
                .await?
        }
    };

    let profile_uploaded = same_profile.is_none();
    let profile = match same_profile {
        Some(profile) => profile,
        None => {
            ctx.cache
                .create_provisioning_profile(
                    app,
                    &ProvisioningProfileInput {
                        provisioning_profile: local.provisioning_profile.clone(),
                        developer_portal_identifier: None,
                        apple_team_id: team_id.clone(),
                        certificate_id: Some(certificate.id.clone()),
                        expires_at: info.expiration_date,
                        device_udids: info.provisioned_devices.clone(),
                    },
                )
                .await?
        }
    };

    ctx.cache
        .set_build_credentials(
            app,
            &BuildCredentialsInput {
                distribution_type: distribution,
                distribution_certificate_id: certificate.id.clone(),
                provisioning_profile_id: profile.id.clone(),
                apple_team_id: team_id,
            },
        )
        .await?;

    if let Some(previous) = previous_profile_id.filter(|id| *id != profile.id) {
        debug!(profile = %previous, "deleting superseded provisioning profile record");
        ctx.cache.delete_provisioning_profile(app, &previous).await?;
    }

    info!(
        build_target = %target.target_name,
        certificate_uploaded,
        profile_uploaded,
        "synced iOS credentials"
    );

    Ok(TargetSync {
        target_name: target.target_name.clone(),
        certificate_uploaded,
        profile_uploaded,
    })
}

fn same_blob(certificate: &DistributionCertificate, local: &[u8]) -> bool {
    certificate.p12_bytes().is_ok_and(|bytes| bytes == local)
}

/// Upload the Android keystore from the credentials file. Returns whether
/// anything was uploaded.
#[instrument(skip_all, fields(app = %app))]
pub async fn sync_android_from_file(
    ctx: &mut Context,
    app: &AppLookupParams,
    credentials_path: &Path,
) -> Result<bool> {
    let file = CredentialsFile::load(credentials_path)?;
    let entry = file.android_keystore(credentials_path)?;
    let local = read_keystore_entry(&ctx.project_dir, entry)?;

    if ctx.cache.keystore(app).await?.as_ref() == Some(&local) {
        debug!("keystore unchanged");
        return Ok(false);
    }
    ctx.cache.set_keystore(app, &local).await?;
    info!(alias = %local.key_alias, "uploaded keystore");
    Ok(true)
}

fn default_ios_paths(target: &BuildTarget, single: bool) -> (String, String) {
    if single {
        (
            format!("{IOS_DIR}/profile.mobileprovision"),
            format!("{IOS_DIR}/dist-cert.p12"),
        )
    } else {
        (
            format!("{IOS_DIR}/{}-profile.mobileprovision", target.target_name),
            format!("{IOS_DIR}/{}-dist-cert.p12", target.target_name),
        )
    }
}

/// Paths already recorded for a target. A single-target entry belongs to
/// the first target only so that other targets never share its files.
fn existing_ios_entry<'a>(
    file: &'a CredentialsFile,
    target: &str,
    first: bool,
) -> Option<&'a IosTargetEntry> {
    match file.ios.as_ref()? {
        IosCredentials::Single(entry) => first.then_some(entry),
        IosCredentials::Multi(entries) => entries.get(target),
    }
}

fn write_blob(project_dir: &Path, relative: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = resolve_path(project_dir, relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, bytes)?;
    Ok(path)
}

fn warn_if_tracked(ctx: &Context, paths: &[PathBuf]) {
    for path in paths {
        if !ctx.vcs().is_ignored(path) {
            ctx.prompter().warn(&format!(
                "{} contains secrets and is not ignored by version control. Add it to .gitignore",
                path.display()
            ));
        }
    }
}

/// Write the iOS credentials of every build target to disk and record them
/// in the credentials file. Returns the written paths.
#[instrument(skip_all, fields(distribution = %distribution, targets = targets.len()))]
pub async fn sync_ios_to_file(
    ctx: &mut Context,
    targets: &[BuildTarget],
    distribution: DistributionType,
    credentials_path: &Path,
) -> Result<Vec<PathBuf>> {
    if targets.is_empty() {
        return Err(CredentialsError::NotFound("no iOS build targets".to_string()));
    }
    let mut file = CredentialsFile::load_or_default(credentials_path)?;
    let single = targets.len() == 1;
    let mut entries = std::collections::BTreeMap::new();
    let mut written = Vec::new();

    for (index, target) in targets.iter().enumerate() {
        let app = &target.app;
        let build = ctx.cache.build_credentials(app, distribution).await?;
        let (certificate_id, profile) = match build
            .map(|b| (b.distribution_certificate_id, b.provisioning_profile))
        {
            Some((Some(cert), Some(profile))) => (cert, profile),
            _ => {
                return Err(CredentialsError::NotFound(format!(
                    "no {} credentials for {}",
                    distribution, app
                )))
            }
        };
        let certificate = ctx
            .cache
            .distribution_certificate(&app.account, &certificate_id)
            .await?
            .ok_or_else(|| {
                CredentialsError::NotFound(format!("distribution certificate {certificate_id}"))
            })?;

        let recorded = existing_ios_entry(&file, &target.target_name, index == 0);
        let (profile_path, certificate_path) = match recorded {
            Some(entry) => (
                entry.provisioning_profile_path.clone(),
                entry.distribution_certificate.path.clone(),
            ),
            None => default_ios_paths(target, single),
        };

        written.push(write_blob(&ctx.project_dir, &profile_path, &profile.content_bytes()?)?);
        written.push(write_blob(
            &ctx.project_dir,
            &certificate_path,
            &certificate.p12_bytes()?,
        )?);

        entries.insert(
            target.target_name.clone(),
            IosTargetEntry {
                provisioning_profile_path: profile_path,
                distribution_certificate: CertificateEntry {
                    path: certificate_path,
                    password: certificate.certificate_password.clone(),
                },
            },
        );
    }

    file.ios = if single {
        entries.into_values().next().map(IosCredentials::Single)
    } else {
        Some(IosCredentials::Multi(entries))
    };

    file.save(credentials_path)?;
    written.push(credentials_path.to_path_buf());
    warn_if_tracked(ctx, &written);
    ctx.prompter().note(&format!(
        "Wrote iOS credentials to {}",
        credentials_path.display()
    ));
    Ok(written)
}

/// Write the Android keystore to disk and record it in the credentials file
#[instrument(skip_all, fields(app = %app))]
pub async fn sync_android_to_file(
    ctx: &mut Context,
    app: &AppLookupParams,
    credentials_path: &Path,
) -> Result<Vec<PathBuf>> {
    let keystore = ctx
        .cache
        .keystore(app)
        .await?
        .ok_or_else(|| CredentialsError::NotFound(format!("no Android keystore for {app}")))?;
    let mut file = CredentialsFile::load_or_default(credentials_path)?;

    let keystore_path = file
        .android
        .as_ref()
        .map(|a| a.keystore.keystore_path.clone())
        .unwrap_or_else(|| ANDROID_KEYSTORE_PATH.to_string());
    let bytes = BASE64.decode(keystore.keystore.trim())?;
    let mut written = vec![write_blob(&ctx.project_dir, &keystore_path, &bytes)?];

    file.android = Some(AndroidCredentials {
        keystore: KeystoreEntry {
            keystore_path,
            keystore_password: keystore.keystore_password,
            key_alias: keystore.key_alias,
            key_password: keystore.key_password,
        },
    });
    file.save(credentials_path)?;
    written.push(credentials_path.to_path_buf());
    warn_if_tracked(ctx, &written);
    ctx.prompter().note(&format!(
        "Wrote Android keystore to {}",
        credentials_path.display()
    ));
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::Vcs;
    use crate::provisioning::sample_profile_bytes;
    use crate::testing::*;

    struct TrackEverything;

    impl Vcs for TrackEverything {
        fn is_ignored(&self, _path: &Path) -> bool {
            false
        }
    }

    fn target(name: &str) -> BuildTarget {
        BuildTarget::new(name, AppLookupParams::new("acct", "app", format!("com.acct.{name}")))
    }

    fn entry_json(name: &str) -> String {
        format!(
            r#"{{"provisioningProfilePath": "{name}.mobileprovision", "distributionCertificate": {{"path": "{name}.p12", "password": "secret"}}}}"#
        )
    }

    /// Write the profile and certificate files of one target
    fn write_target_files(dir: &Path, name: &str, serial: &str) {
        std::fs::write(
            dir.join(format!("{name}.mobileprovision")),
            sample_profile_bytes(TEAM_ID, &[]),
        )
        .unwrap();
        std::fs::write(dir.join(format!("{name}.p12")), format!("p12-{serial}")).unwrap();
    }

    fn ctx_in(dir: &Path, remote: &Arc<FakeRemoteStore>) -> Context {
        let portal = Arc::new(FakePortal::new());
        let mut ctx = non_interactive_context(remote, &portal);
        ctx.project_dir = dir.to_path_buf();
        ctx
    }

    #[tokio::test]
    async fn test_missing_target_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"ios": {{"app": {}, "app-dev": {}}}}}"#,
                entry_json("app"),
                entry_json("app-dev")
            ),
        )
        .unwrap();

        let remote = Arc::new(FakeRemoteStore::new());
        let mut ctx = ctx_in(dir.path(), &remote);
        let targets = [target("app"), target("app-dev"), target("app-widget")];

        let err = sync_ios_from_file(&mut ctx, &targets, DistributionType::AppStore, &path)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("app-widget"));
        assert!(err.is_validation());
        assert_eq!(remote.calls("fetch_app_credentials"), 0);
        assert_eq!(remote.calls("fetch_account_credentials"), 0);
        assert_eq!(remote.mutations(), 0);
    }

    #[tokio::test]
    async fn test_identical_blobs_are_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, format!(r#"{{"ios": {}}}"#, entry_json("app"))).unwrap();
        write_target_files(dir.path(), "app", "SERIAL1");

        let app_target = target("app");
        let remote = Arc::new(FakeRemoteStore::new());
        remote.insert_certificate("acct", certificate("U1", "SERIAL1"));
        remote.insert_app(
            &app_target.app,
            app_with_build(
                &app_target.app,
                DistributionType::AppStore,
                "U1",
                profile_with_devices("profile-1", "P1", "U1", &[]),
            ),
        );
        let mut ctx = ctx_in(dir.path(), &remote);

        let results = sync_ios_from_file(
            &mut ctx,
            std::slice::from_ref(&app_target),
            DistributionType::AppStore,
            &path,
        )
        .await
        .unwrap();

        assert!(!results[0].certificate_uploaded);
        assert!(!results[0].profile_uploaded);
        assert_eq!(remote.calls("create_distribution_certificate"), 0);
        assert_eq!(remote.calls("create_provisioning_profile"), 0);
        assert_eq!(remote.calls("upsert_build_credentials"), 0);
        assert_eq!(remote.calls("create_or_get_apple_team"), 0);
        assert_eq!(remote.calls("create_or_get_apple_app_identifier"), 0);
    }

    #[tokio::test]
    async fn test_replaced_profile_record_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, format!(r#"{{"ios": {}}}"#, entry_json("app"))).unwrap();
        write_target_files(dir.path(), "app", "SERIAL1");
        std::fs::write(
            dir.path().join("app.mobileprovision"),
            sample_profile_bytes(TEAM_ID, &["D9"]),
        )
        .unwrap();

        let app_target = target("app");
        let remote = Arc::new(FakeRemoteStore::new());
        remote.insert_certificate("acct", certificate("U1", "SERIAL1"));
        remote.insert_app(
            &app_target.app,
            app_with_build(
                &app_target.app,
                DistributionType::AdHoc,
                "U1",
                profile_with_devices("profile-1", "P1", "U1", &[]),
            ),
        );
        let mut ctx = ctx_in(dir.path(), &remote);

        let results = sync_ios_from_file(
            &mut ctx,
            std::slice::from_ref(&app_target),
            DistributionType::AdHoc,
            &path,
        )
        .await
        .unwrap();

        assert!(!results[0].certificate_uploaded);
        assert!(results[0].profile_uploaded);
        assert!(!remote.has_profile("profile-1"));

        let build = remote
            .app(&app_target.app)
            .unwrap()
            .build_credentials_for(DistributionType::AdHoc)
            .cloned()
            .unwrap();
        let profile = build.provisioning_profile.unwrap();
        assert_ne!(profile.id, "profile-1");
        assert_eq!(profile.device_udids, vec!["D9"]);
        assert_eq!(build.distribution_certificate_id.as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn test_unchanged_certificate_learns_team_from_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, format!(r#"{{"ios": {}}}"#, entry_json("app"))).unwrap();
        write_target_files(dir.path(), "app", "SERIAL1");

        let app_target = target("app");
        let remote = Arc::new(FakeRemoteStore::new());
        let mut teamless = certificate("U1", "SERIAL1");
        teamless.apple_team = None;
        remote.insert_certificate("acct", teamless);
        remote.insert_app(
            &app_target.app,
            app_with_build(
                &app_target.app,
                DistributionType::AppStore,
                "U1",
                profile_with_devices("profile-1", "P1", "U1", &[]),
            ),
        );
        let mut ctx = ctx_in(dir.path(), &remote);

        let results = sync_ios_from_file(
            &mut ctx,
            std::slice::from_ref(&app_target),
            DistributionType::AppStore,
            &path,
        )
        .await
        .unwrap();

        assert!(!results[0].certificate_uploaded);
        assert!(!results[0].profile_uploaded);
        assert_eq!(remote.calls("update_distribution_certificate"), 1);
        assert_eq!(remote.calls("create_distribution_certificate"), 0);
        assert!(remote.has_profile("profile-1"));

        let cert = ctx
            .cache
            .distribution_certificate("acct", "U1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cert.apple_team.unwrap().team_identifier, TEAM_ID);
    }

    #[tokio::test]
    async fn test_new_blobs_are_uploaded_and_assigned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"ios": {{"app": {}, "app-widget": {}}}}}"#,
                entry_json("app"),
                entry_json("app-widget")
            ),
        )
        .unwrap();
        write_target_files(dir.path(), "app", "SERIAL1");
        write_target_files(dir.path(), "app-widget", "SERIAL1");

        let remote = Arc::new(FakeRemoteStore::new());
        let mut ctx = ctx_in(dir.path(), &remote);
        let targets = [target("app"), target("app-widget")];

        let results = sync_ios_from_file(&mut ctx, &targets, DistributionType::AppStore, &path)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.certificate_uploaded && r.profile_uploaded));

        for t in &targets {
            let record = remote.app(&t.app).unwrap();
            let build = record
                .build_credentials_for(DistributionType::AppStore)
                .unwrap();
            assert!(build.distribution_certificate_id.is_some());
            assert_eq!(build.apple_team.as_ref().unwrap().team_identifier, TEAM_ID);
        }
    }

    #[tokio::test]
    async fn test_single_target_store_rejects_many_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"ios": {{"app": {}, "app-widget": {}}}}}"#,
                entry_json("app"),
                entry_json("app-widget")
            ),
        )
        .unwrap();

        let remote = Arc::new(FakeRemoteStore::single_target());
        let mut ctx = ctx_in(dir.path(), &remote);
        let err = sync_ios_from_file(
            &mut ctx,
            &[target("app"), target("app-widget")],
            DistributionType::AppStore,
            &path,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CredentialsError::Inconsistent(_)));
    }

    #[tokio::test]
    async fn test_android_keystore_upload_is_skipped_when_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"android": {"keystore": {"keystorePath": "ks.jks", "keystorePassword": "pw", "keyAlias": "alias"}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("ks.jks"), b"jks").unwrap();

        let app = AppLookupParams::new("acct", "app", "com.acct.app");
        let remote = Arc::new(FakeRemoteStore::new());
        let mut ctx = ctx_in(dir.path(), &remote);

        assert!(sync_android_from_file(&mut ctx, &app, &path).await.unwrap());
        assert!(!sync_android_from_file(&mut ctx, &app, &path).await.unwrap());
        assert_eq!(remote.calls("set_keystore"), 1);
    }

    #[tokio::test]
    async fn test_to_file_writes_blobs_and_keeps_android_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"android": {"keystore": {"keystorePath": "ks.jks", "keystorePassword": "pw", "keyAlias": "alias"}}}"#,
        )
        .unwrap();

        let app_target = target("app");
        let remote = Arc::new(FakeRemoteStore::new());
        remote.insert_certificate("acct", certificate("U1", "SERIAL1"));
        remote.insert_app(
            &app_target.app,
            app_with_build(
                &app_target.app,
                DistributionType::AppStore,
                "U1",
                profile_with_devices("profile-1", "P1", "U1", &[]),
            ),
        );
        let prompter = ScriptedPrompter::new(vec![]);
        let portal = Arc::new(FakePortal::new());
        let mut ctx = context(&remote, &portal, &prompter).with_vcs(Box::new(TrackEverything));
        ctx.project_dir = dir.path().to_path_buf();

        let written = sync_ios_to_file(
            &mut ctx,
            std::slice::from_ref(&app_target),
            DistributionType::AppStore,
            &path,
        )
        .await
        .unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(
            std::fs::read(dir.path().join("credentials/ios/dist-cert.p12")).unwrap(),
            b"p12-SERIAL1"
        );
        let file = CredentialsFile::load(&path).unwrap();
        assert!(file.android.is_some());
        assert!(matches!(file.ios, Some(IosCredentials::Single(_))));
        assert_eq!(prompter.warnings().len(), 3);
    }

    #[tokio::test]
    async fn test_to_file_gives_each_target_its_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, format!(r#"{{"ios": {}}}"#, entry_json("shared"))).unwrap();

        let targets = [target("app"), target("app-widget")];
        let remote = Arc::new(FakeRemoteStore::new());
        let seeds = [(&targets[0], "U1", "SERIAL1"), (&targets[1], "U2", "SERIAL2")];
        for (t, cert, serial) in seeds {
            remote.insert_certificate("acct", certificate(cert, serial));
            remote.insert_app(
                &t.app,
                app_with_build(
                    &t.app,
                    DistributionType::AppStore,
                    cert,
                    profile_with_devices(&format!("profile-{cert}"), "P1", cert, &[]),
                ),
            );
        }
        let mut ctx = ctx_in(dir.path(), &remote);

        sync_ios_to_file(&mut ctx, &targets, DistributionType::AppStore, &path)
            .await
            .unwrap();

        let file = CredentialsFile::load(&path).unwrap();
        let Some(IosCredentials::Multi(entries)) = file.ios else {
            panic!("expected one entry per target");
        };
        let app_cert = &entries["app"].distribution_certificate.path;
        let widget_cert = &entries["app-widget"].distribution_certificate.path;
        assert_eq!(app_cert, "shared.p12");
        assert_ne!(app_cert, widget_cert);
        assert_ne!(
            entries["app"].provisioning_profile_path,
            entries["app-widget"].provisioning_profile_path
        );

        assert_eq!(std::fs::read(dir.path().join(app_cert)).unwrap(), b"p12-SERIAL1");
        assert_eq!(std::fs::read(dir.path().join(widget_cert)).unwrap(), b"p12-SERIAL2");
    }
}
