use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, info};

use super::profile::{certificate_serial, create_portal_profile, store_profile};
use crate::context::Context;
use crate::error::{CredentialsError, Result};
use crate::portal::{PortalSession, ProfileClass};
use crate::provisioning::embedded_device_udids;
use crate::types::{
    AppLookupParams, AppleTeam, Device, DistributionCertificate, DistributionType,
    ProvisioningProfile,
};

async fn register_first_device(ctx: &Context, session: &PortalSession) -> Result<Device> {
    ctx.prompter()
        .note("No devices are registered on the Apple Developer Portal yet");
    let udid = ctx
        .prompter()
        .text("UDID of the device to register", None)
        .await?;
    let name = ctx.prompter().text("Device name", None).await?;
    let device = ctx
        .portal()
        .register_device(session, name.trim(), udid.trim())
        .await?;
    info!(udid = %device.udid, "registered device");
    Ok(device)
}

async fn choose_devices(
    ctx: &Context,
    devices: Vec<Device>,
    previous: Option<&ProvisioningProfile>,
) -> Result<Vec<Device>> {
    let registered: BTreeSet<&str> = devices.iter().map(|d| d.udid.as_str()).collect();
    if let Some(prev) = previous {
        let embedded = embedded_device_udids(prev);
        let embedded: BTreeSet<&str> = embedded.iter().map(String::as_str).collect();
        if embedded == registered {
            debug!("profile already covers every registered device");
            return Ok(devices);
        }
    }

    let exclude = ctx
        .prompter()
        .confirm(
            &format!(
                "The profile will include all {} registered devices. Exclude some of them?",
                devices.len()
            ),
            false,
        )
        .await?;
    if !exclude {
        return Ok(devices);
    }

    let items: Vec<String> = devices.iter().map(|d| d.to_string()).collect();
    let defaults = vec![true; items.len()];
    let picked = ctx
        .prompter()
        .multi_select("Select devices for the profile", &items, &defaults)
        .await?;
    if picked.is_empty() {
        return Err(CredentialsError::MissingPrerequisite(
            "at least one device must be selected for the provisioning profile".to_string(),
        ));
    }
    Ok(picked
        .into_iter()
        .filter_map(|i| devices.get(i).cloned())
        .collect())
}

/// Profile for Ad Hoc and Development builds: bound to exactly the chosen
/// device set and certificate.
pub(super) async fn resolve_device_profile(
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
    let portal = ctx.portal();

    let mut devices = portal.list_devices(session).await?;
    if devices.is_empty() {
        devices.push(register_first_device(ctx, session).await?);
    }
    let chosen = choose_devices(ctx, devices, previous).await?;
    let chosen_udids: BTreeSet<String> = chosen.iter().map(|d| d.udid.clone()).collect();

    let now = Utc::now();
    let listing = portal
        .list_provisioning_profiles(session, &app.bundle_identifier, class)
        .await?;
    let reusable = listing.iter().find(|p| {
        p.is_active(now)
            && p.uses_certificate(&serial)
            && p.device_udids.iter().cloned().collect::<BTreeSet<_>>() == chosen_udids
    });

    let portal_profile = match reusable {
        Some(existing) => {
            debug!(profile = %existing.id, "reusing portal profile with the same devices");
            existing.clone()
        }
        None => {
            let device_ids = chosen.iter().map(|d| d.id.clone()).collect();
            let created =
                create_portal_profile(ctx, app, class, session, certificate, device_ids).await?;

            // the superseded profile would otherwise linger on the portal
            let stale = previous
                .and_then(|p| p.developer_portal_identifier.as_deref())
                .filter(|id| *id != created.id.as_str())
                .filter(|id| listing.iter().any(|p| p.id == *id));
            if let Some(stale) = stale {
                debug!(profile = %stale, "revoking superseded portal profile");
                portal.revoke_provisioning_profile(session, stale).await?;
            }
            created
        }
    };

    store_profile(ctx, app, team, certificate, &portal_profile, previous).await
}
