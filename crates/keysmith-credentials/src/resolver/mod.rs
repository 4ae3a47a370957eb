//! Build credential resolution
//!
//! Decides, for one app and distribution type, whether the credentials on
//! record can be reused or which parts must be regenerated, and persists the
//! result as the app's build credentials.

mod adhoc;
mod android;
mod certificate;
mod profile;

pub use android::resolve_keystore;
pub use certificate::generate_distribution_certificate;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::cache::CredentialCache;
use crate::context::Context;
use crate::error::{CredentialsError, Result};
use crate::types::{
    AppLookupParams, AppleTeam, BuildCredentialsInput, DistributionCertificate, DistributionType,
    ProvisioningProfile, ResolvedBuildCredentials,
};
use crate::validators::{validate_distribution_certificate, validate_provisioning_profile, Validity};

/// Current record of (app, distribution type) and what the portal says about it
struct Existing {
    certificate: Option<DistributionCertificate>,
    profile: Option<ProvisioningProfile>,
    certificate_validity: Validity,
    profile_validity: Validity,
}

impl Existing {
    /// Interactive runs reuse only what the portal confirmed. Without a
    /// session, non-interactive runs trust what cannot be checked.
    fn is_acceptable(&self, interactive: bool) -> bool {
        if self.certificate.is_none() || self.profile.is_none() {
            return false;
        }
        if interactive {
            self.certificate_validity.is_valid() && self.profile_validity.is_valid()
        } else {
            !self.certificate_validity.is_invalid() && !self.profile_validity.is_invalid()
        }
    }
}

async fn inspect_existing(
    ctx: &mut Context,
    app: &AppLookupParams,
    distribution: DistributionType,
) -> Result<Existing> {
    let build = ctx.cache.build_credentials(app, distribution).await?;
    let certificate = match build.as_ref().and_then(|b| b.distribution_certificate_id.clone()) {
        Some(id) => ctx.cache.distribution_certificate(&app.account, &id).await?,
        None => None,
    };
    let profile = build.and_then(|b| b.provisioning_profile);

    let missing = Validity::Invalid("not set up".to_string());
    let (Some(cert), Some(prof)) = (&certificate, &profile) else {
        return Ok(Existing {
            certificate,
            profile,
            certificate_validity: missing.clone(),
            profile_validity: missing,
        });
    };

    let session = if ctx.is_interactive() {
        Some(ctx.portal_session().await?)
    } else {
        ctx.try_portal_session().await
    };
    let portal = ctx.portal();
    let now = Utc::now();

    let certificate_validity =
        validate_distribution_certificate(portal.as_ref(), session.as_ref(), cert, now).await;
    let profile_validity = if certificate_validity.is_invalid() {
        Validity::Invalid("its certificate is not valid".to_string())
    } else {
        validate_provisioning_profile(
            portal.as_ref(),
            session.as_ref(),
            app,
            distribution,
            prof,
            cert,
            now,
        )
        .await
    };
    debug!(
        certificate = %certificate_validity,
        profile = %profile_validity,
        "validated existing build credentials"
    );

    Ok(Existing {
        certificate,
        profile,
        certificate_validity,
        profile_validity,
    })
}

/// Register the app identifier with the remote store. A wildcard bundle
/// identifier can only be registered for a known team.
pub(crate) async fn register_app_identifier(
    cache: &mut CredentialCache,
    app: &AppLookupParams,
    team: Option<&AppleTeam>,
) -> Result<()> {
    if app.is_wildcard() && team.is_none() {
        return Err(CredentialsError::MissingPrerequisite(format!(
            "an Apple Team is required for the wildcard bundle identifier {}",
            app.bundle_identifier
        )));
    }
    cache.create_or_get_apple_app_identifier(app, team).await?;
    Ok(())
}

/// Return valid build credentials for (app, distribution type), creating or
/// regenerating the certificate and profile as needed.
///
/// Valid existing credentials are returned without any mutation. In
/// non-interactive mode nothing is ever generated.
#[instrument(skip_all, fields(app = %app, distribution = %distribution))]
pub async fn resolve_build_credentials(
    ctx: &mut Context,
    app: &AppLookupParams,
    distribution: DistributionType,
) -> Result<ResolvedBuildCredentials> {
    let existing = inspect_existing(ctx, app, distribution).await?;

    if existing.is_acceptable(ctx.is_interactive()) {
        if let (Some(certificate), Some(profile)) = (&existing.certificate, &existing.profile) {
            info!("reusing existing build credentials");
            let apple_team = profile
                .apple_team
                .clone()
                .or_else(|| certificate.apple_team.clone());
            return Ok(ResolvedBuildCredentials {
                distribution_type: distribution,
                distribution_certificate: certificate.clone(),
                provisioning_profile: profile.clone(),
                apple_team,
            });
        }
    }

    if !ctx.is_interactive() {
        return Err(CredentialsError::non_interactive(
            format!("{} credentials", distribution),
            app,
        ));
    }

    let session = ctx.portal_session().await?;
    let team = ctx
        .cache
        .create_or_get_apple_team(&app.account, &session.team)
        .await?;
    ctx.portal()
        .ensure_bundle_identifier(&session, &app.bundle_identifier)
        .await?;
    register_app_identifier(&mut ctx.cache, app, Some(&team)).await?;

    let certificate = match existing.certificate {
        Some(cert) if existing.certificate_validity.is_valid() => cert,
        _ => certificate::resolve_distribution_certificate(ctx, app, &session, &team).await?,
    };

    let previous = existing.profile;
    let profile = match distribution {
        DistributionType::AppStore | DistributionType::Enterprise => {
            profile::resolve_store_profile(
                ctx,
                app,
                distribution,
                &session,
                &team,
                &certificate,
                previous.as_ref(),
            )
            .await?
        }
        DistributionType::AdHoc | DistributionType::Development => {
            adhoc::resolve_device_profile(
                ctx,
                app,
                distribution,
                &session,
                &team,
                &certificate,
                previous.as_ref(),
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
                apple_team_id: Some(team.id.clone()),
            },
        )
        .await?;

    if let Some(previous) = previous.filter(|p| p.id != profile.id) {
        debug!(profile = %previous.id, "deleting superseded provisioning profile record");
        ctx.cache
            .delete_provisioning_profile(app, &previous.id)
            .await?;
    }

    let certificate = ctx
        .cache
        .distribution_certificate(&app.account, &certificate.id)
        .await?
        .unwrap_or(certificate);
    ctx.prompter().note(&format!(
        "{} credentials for {} are set up",
        distribution, app.bundle_identifier
    ));

    Ok(ResolvedBuildCredentials {
        distribution_type: distribution,
        distribution_certificate: certificate,
        provisioning_profile: profile,
        apple_team: Some(team),
    })
}
