use chrono::Utc;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::{CredentialsError, Result};
use crate::portal::{PortalProfile, PortalSession, ProfileClass, ProfileRequest};
use crate::types::{
    AppLookupParams, AppleTeam, DistributionCertificate, DistributionType, ProvisioningProfile,
    ProvisioningProfileInput,
};

pub(super) fn certificate_serial(certificate: &DistributionCertificate) -> Result<String> {
    certificate.serial_number.clone().ok_or_else(|| {
        CredentialsError::Inconsistent(format!(
            "distribution certificate {} has no serial number",
            certificate.id
        ))
    })
}

/// Portal id of the certificate, looked up by serial number when the record
/// does not carry it
pub(super) async fn certificate_portal_id(
    ctx: &Context,
    session: &PortalSession,
    certificate: &DistributionCertificate,
) -> Result<String> {
    if let Some(id) = &certificate.developer_portal_identifier {
        return Ok(id.clone());
    }
    let serial = certificate_serial(certificate)?;
    ctx.portal()
        .list_distribution_certificates(session)
        .await?
        .into_iter()
        .find(|c| c.serial_number.eq_ignore_ascii_case(&serial))
        .map(|c| c.id)
        .ok_or_else(|| {
            CredentialsError::Inconsistent(format!(
                "distribution certificate with serial {} is not on the developer portal",
                serial
            ))
        })
}

pub(super) fn profile_name(bundle_identifier: &str, class: ProfileClass) -> String {
    format!(
        "*[keysmith] {} {:?} {}",
        bundle_identifier,
        class,
        Utc::now().timestamp()
    )
}

pub(super) async fn create_portal_profile(
    ctx: &Context,
    app: &AppLookupParams,
    class: ProfileClass,
    session: &PortalSession,
    certificate: &DistributionCertificate,
    device_ids: Vec<String>,
) -> Result<PortalProfile> {
    let request = ProfileRequest {
        name: profile_name(&app.bundle_identifier, class),
        bundle_identifier: app.bundle_identifier.clone(),
        class,
        certificate_portal_id: certificate_portal_id(ctx, session, certificate).await?,
        device_ids,
    };
    let created = ctx
        .portal()
        .create_provisioning_profile(session, &request)
        .await?;
    info!(profile = %created.id, name = %created.name, "created provisioning profile on portal");
    Ok(created)
}

/// Profile for App Store and Enterprise builds
pub(super) async fn resolve_store_profile(
    ctx: &mut Context,
    app: &AppLookupParams,
    distribution: DistributionType,
    session: &PortalSession,
    team: &AppleTeam,
    certificate: &DistributionCertificate,
    previous: Option<&ProvisioningProfile>,
) -> Result<ProvisioningProfile> {
    let class = ProfileClass::from(distribution);
    let serial = certificate_serial(certificate)?;
    let now = Utc::now();

    let listing: Vec<PortalProfile> = ctx
        .portal()
        .list_provisioning_profiles(session, &app.bundle_identifier, class)
        .await?
        .into_iter()
        .filter(|p| p.is_active(now))
        .collect();

    let matching = listing.iter().find(|p| p.uses_certificate(&serial)).cloned();
    let portal_profile = if let Some(existing) = matching {
        let keep = ctx
            .prompter()
            .confirm(
                &format!(
                    "Use the existing provisioning profile '{}' on the developer portal?",
                    existing.name
                ),
                true,
            )
            .await?;
        if keep {
            existing
        } else {
            create_portal_profile(ctx, app, class, session, certificate, Vec::new()).await?
        }
    } else if let Some(other) = listing.first().cloned() {
        let items = vec![
            format!("Regenerate '{}' for the selected certificate", other.name),
            "Create a new provisioning profile".to_string(),
        ];
        let choice = ctx
            .prompter()
            .select(
                &format!(
                    "A {} provisioning profile for {} exists for another certificate",
                    distribution, app.bundle_identifier
                ),
                &items,
                0,
            )
            .await?;
        if choice == 0 {
            debug!(profile = %other.id, "revoking profile to regenerate it");
            ctx.portal()
                .revoke_provisioning_profile(session, &other.id)
                .await?;
        }
        create_portal_profile(ctx, app, class, session, certificate, Vec::new()).await?
    } else {
        create_portal_profile(ctx, app, class, session, certificate, Vec::new()).await?
    };

    store_profile(ctx, app, team, certificate, &portal_profile, previous).await
}

/// Persist a portal profile as a remote record, reusing the previous record
/// when it already holds this profile.
pub(super) async fn store_profile(
    ctx: &mut Context,
    app: &AppLookupParams,
    team: &AppleTeam,
    certificate: &DistributionCertificate,
    portal_profile: &PortalProfile,
    previous: Option<&ProvisioningProfile>,
) -> Result<ProvisioningProfile> {
    let input = ProvisioningProfileInput {
        provisioning_profile: portal_profile.content.clone(),
        developer_portal_identifier: Some(portal_profile.id.clone()),
        apple_team_id: Some(team.id.clone()),
        certificate_id: Some(certificate.id.clone()),
        expires_at: portal_profile.expires_at,
        device_udids: portal_profile.device_udids.clone(),
    };

    match previous {
        Some(prev)
            if prev.developer_portal_identifier.as_deref() == Some(portal_profile.id.as_str()) =>
        {
            let unchanged = prev.provisioning_profile.trim() == portal_profile.content.trim()
                && prev.certificate_id.as_deref() == Some(certificate.id.as_str());
            if unchanged {
                return Ok(prev.clone());
            }
            ctx.cache
                .update_provisioning_profile(app, &prev.id, &input)
                .await
        }
        _ => ctx.cache.create_provisioning_profile(app, &input).await,
    }
}
