//! Validity checks against the developer portal's current listing
//!
//! Validators never mutate anything. Without a portal session, or when the
//! portal cannot be queried, they report [`Validity::Unknown`] instead of
//! failing.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::portal::{DeveloperPortal, PortalProfile, PortalResult, PortalSession, ProfileClass};
use crate::provisioning::embedded_device_udids;
use crate::types::{
    AppLookupParams, Device, DistributionCertificate, DistributionType, ProvisioningProfile,
};

/// Outcome of a validity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(String),
    /// Could not be checked
    Unknown(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

impl std::fmt::Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Invalid(reason) => write!(f, "invalid: {}", reason),
            Self::Unknown(reason) => write!(f, "unknown: {}", reason),
        }
    }
}

/// Serial numbers of the team's non-revoked distribution certificates,
/// upper-cased
pub async fn valid_serial_numbers(
    portal: &dyn DeveloperPortal,
    session: &PortalSession,
) -> PortalResult<HashSet<String>> {
    Ok(portal
        .list_distribution_certificates(session)
        .await?
        .into_iter()
        .map(|c| c.serial_number.to_ascii_uppercase())
        .collect())
}

/// A certificate is valid while it is unexpired and its serial number is in
/// the portal's listing
pub fn is_distribution_certificate_valid(
    certificate: &DistributionCertificate,
    valid_serials: &HashSet<String>,
    now: DateTime<Utc>,
) -> bool {
    !certificate.is_expired(now)
        && certificate
            .serial_number
            .as_ref()
            .is_some_and(|serial| valid_serials.contains(&serial.to_ascii_uppercase()))
}

/// Check a certificate against the portal
pub async fn validate_distribution_certificate(
    portal: &dyn DeveloperPortal,
    session: Option<&PortalSession>,
    certificate: &DistributionCertificate,
    now: DateTime<Utc>,
) -> Validity {
    if certificate.is_expired(now) {
        return Validity::Invalid("certificate has expired".to_string());
    }
    let Some(session) = session else {
        return Validity::Unknown("not authenticated with the developer portal".to_string());
    };

    match valid_serial_numbers(portal, session).await {
        Ok(serials) if is_distribution_certificate_valid(certificate, &serials, now) => {
            Validity::Valid
        }
        Ok(_) => Validity::Invalid("certificate is revoked or unknown to the portal".to_string()),
        Err(e) => {
            debug!(error = %e, "could not list distribution certificates");
            Validity::Unknown(e.to_string())
        }
    }
}

/// Whether the profile embeds a device list
pub fn is_ad_hoc_profile(profile: &ProvisioningProfile) -> bool {
    !embedded_device_udids(profile).is_empty()
}

/// Whether the profile's devices cover every registered device
pub fn covers_registered_devices(profile: &ProvisioningProfile, registered: &[Device]) -> bool {
    let embedded: BTreeSet<String> = embedded_device_udids(profile).into_iter().collect();
    registered.iter().all(|d| embedded.contains(&d.udid))
}

/// Portal listing entry matching a stored profile, by portal id or content
pub fn find_portal_profile<'a>(
    profile: &ProvisioningProfile,
    listing: &'a [PortalProfile],
) -> Option<&'a PortalProfile> {
    listing
        .iter()
        .find(|p| profile.developer_portal_identifier.as_deref() == Some(p.id.as_str()))
        .or_else(|| {
            listing
                .iter()
                .find(|p| p.content.trim() == profile.provisioning_profile.trim())
        })
}

/// Profile checks that need no network
pub fn check_provisioning_profile(
    profile: &ProvisioningProfile,
    bundle_identifier: &str,
    certificate_serial: &str,
    listing: &[PortalProfile],
    registered_devices: Option<&[Device]>,
    now: DateTime<Utc>,
) -> Validity {
    if profile.is_expired(now) {
        return Validity::Invalid("profile has expired".to_string());
    }
    let Some(portal_profile) = find_portal_profile(profile, listing) else {
        return Validity::Invalid("profile not found on the developer portal".to_string());
    };
    if portal_profile.bundle_identifier != bundle_identifier {
        return Validity::Invalid(format!(
            "profile is for {}, not {}",
            portal_profile.bundle_identifier, bundle_identifier
        ));
    }
    if !portal_profile.is_active(now) {
        return Validity::Invalid("profile is expired or invalid on the portal".to_string());
    }
    if !portal_profile.uses_certificate(certificate_serial) {
        return Validity::Invalid("profile was not generated for this certificate".to_string());
    }
    if let Some(devices) = registered_devices {
        if !covers_registered_devices(profile, devices) {
            return Validity::Invalid(
                "profile does not include every registered device".to_string(),
            );
        }
    }
    Validity::Valid
}

/// Check a profile against the portal
pub async fn validate_provisioning_profile(
    portal: &dyn DeveloperPortal,
    session: Option<&PortalSession>,
    app: &AppLookupParams,
    distribution: DistributionType,
    profile: &ProvisioningProfile,
    certificate: &DistributionCertificate,
    now: DateTime<Utc>,
) -> Validity {
    if profile.is_expired(now) {
        return Validity::Invalid("profile has expired".to_string());
    }
    let Some(session) = session else {
        return Validity::Unknown("not authenticated with the developer portal".to_string());
    };
    let Some(serial) = certificate.serial_number.as_deref() else {
        return Validity::Unknown("certificate serial number unknown".to_string());
    };

    let listing = match portal
        .list_provisioning_profiles(
            session,
            &app.bundle_identifier,
            ProfileClass::from(distribution),
        )
        .await
    {
        Ok(listing) => listing,
        Err(e) => return Validity::Unknown(e.to_string()),
    };

    let devices = if distribution.is_device_bound() {
        match portal.list_devices(session).await {
            Ok(devices) => Some(devices),
            Err(e) => return Validity::Unknown(e.to_string()),
        }
    } else {
        None
    };

    check_provisioning_profile(
        profile,
        &app.bundle_identifier,
        serial,
        &listing,
        devices.as_deref(),
        now,
    )
}
