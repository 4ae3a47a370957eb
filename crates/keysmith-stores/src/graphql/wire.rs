//! Response and variable shapes of the credential store API

use chrono::{DateTime, Utc};
use keysmith_credentials::types::{
    app_cache_key, AppCredentials, AppLookupParams, AppleTeam, BuildCredentials,
    BuildCredentialsInput, DistributionCertificate, DistributionCertificateInput,
    DistributionType, Keystore, ProfileStatus, ProvisioningProfile, ProvisioningProfileInput,
    PushKey, PushKeyInput,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum WireDistributionType {
    AppStore,
    AdHoc,
    Enterprise,
    Development,
}

impl From<WireDistributionType> for DistributionType {
    fn from(value: WireDistributionType) -> Self {
        match value {
            WireDistributionType::AppStore => Self::AppStore,
            WireDistributionType::AdHoc => Self::AdHoc,
            WireDistributionType::Enterprise => Self::Enterprise,
            WireDistributionType::Development => Self::Development,
        }
    }
}

impl From<DistributionType> for WireDistributionType {
    fn from(value: DistributionType) -> Self {
        match value {
            DistributionType::AppStore => Self::AppStore,
            DistributionType::AdHoc => Self::AdHoc,
            DistributionType::Enterprise => Self::Enterprise,
            DistributionType::Development => Self::Development,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum WireProfileStatus {
    Active,
    Expired,
    Invalid,
}

impl From<WireProfileStatus> for ProfileStatus {
    fn from(value: WireProfileStatus) -> Self {
        match value {
            WireProfileStatus::Active => Self::Active,
            WireProfileStatus::Expired => Self::Expired,
            WireProfileStatus::Invalid => Self::Invalid,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAssignedApp {
    project_full_name: String,
    bundle_identifier: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCertificate {
    id: String,
    certificate_p12: String,
    certificate_password: String,
    serial_number: Option<String>,
    apple_team: Option<AppleTeam>,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    developer_portal_identifier: Option<String>,
    #[serde(default)]
    assigned_apps: Vec<WireAssignedApp>,
}

impl From<WireCertificate> for DistributionCertificate {
    fn from(wire: WireCertificate) -> Self {
        Self {
            id: wire.id,
            certificate_p12: wire.certificate_p12,
            certificate_password: wire.certificate_password,
            serial_number: wire.serial_number,
            apple_team: wire.apple_team,
            valid_from: wire.valid_from,
            valid_until: wire.valid_until,
            developer_portal_identifier: wire.developer_portal_identifier,
            assigned_apps: wire
                .assigned_apps
                .iter()
                .map(|a| app_cache_key(&a.project_full_name, &a.bundle_identifier))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireProfile {
    id: String,
    provisioning_profile: String,
    developer_portal_identifier: Option<String>,
    status: Option<WireProfileStatus>,
    expires_at: Option<DateTime<Utc>>,
    apple_team: Option<AppleTeam>,
    certificate_id: Option<String>,
    #[serde(default)]
    device_udids: Vec<String>,
}

impl From<WireProfile> for ProvisioningProfile {
    fn from(wire: WireProfile) -> Self {
        Self {
            id: wire.id,
            provisioning_profile: wire.provisioning_profile,
            developer_portal_identifier: wire.developer_portal_identifier,
            status: wire.status.map(Into::into),
            expires_at: wire.expires_at,
            apple_team: wire.apple_team,
            certificate_id: wire.certificate_id,
            device_udids: wire.device_udids,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireBuildCredentials {
    id: String,
    distribution_type: WireDistributionType,
    distribution_certificate_id: Option<String>,
    provisioning_profile: Option<WireProfile>,
    apple_team: Option<AppleTeam>,
}

impl From<WireBuildCredentials> for BuildCredentials {
    fn from(wire: WireBuildCredentials) -> Self {
        Self {
            id: wire.id,
            distribution_type: wire.distribution_type.into(),
            distribution_certificate_id: wire.distribution_certificate_id,
            provisioning_profile: wire.provisioning_profile.map(Into::into),
            apple_team: wire.apple_team,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAppCredentials {
    id: String,
    project_full_name: String,
    bundle_identifier: String,
    parent_bundle_identifier: Option<String>,
    push_key_id: Option<String>,
    #[serde(default)]
    build_credentials: Vec<WireBuildCredentials>,
    keystore: Option<Keystore>,
}

impl From<WireAppCredentials> for AppCredentials {
    fn from(wire: WireAppCredentials) -> Self {
        Self {
            id: wire.id,
            project_full_name: wire.project_full_name,
            bundle_identifier: wire.bundle_identifier,
            parent_bundle_identifier: wire.parent_bundle_identifier,
            push_key_id: wire.push_key_id,
            build_credentials: wire
                .build_credentials
                .into_iter()
                .map(|b| {
                    let build = BuildCredentials::from(b);
                    (build.distribution_type, build)
                })
                .collect(),
            keystore: wire.keystore,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAccount {
    #[serde(default)]
    pub app_credentials: Vec<WireAppCredentials>,
    #[serde(default)]
    pub distribution_certificates: Vec<WireCertificate>,
    #[serde(default)]
    pub push_keys: Vec<PushKey>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountData {
    pub account: Option<WireAccount>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppData {
    pub app_credentials: Option<WireAppCredentials>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUserCredential {
    pub distribution_certificate: Option<WireCertificate>,
    pub push_key: Option<PushKey>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserCredentialData {
    pub account: Option<WireUserCredential>,
}

/// Mutation payload, always aliased to `record`
#[derive(Debug, Deserialize)]
pub(crate) struct Mutation<T> {
    pub record: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordId {
    #[allow(dead_code)]
    pub id: String,
}

pub(crate) fn app_variable(app: &AppLookupParams) -> Value {
    json!({
        "accountName": app.account,
        "projectName": app.project,
        "bundleIdentifier": app.bundle_identifier,
        "parentBundleIdentifier": app.parent_bundle_identifier,
    })
}

pub(crate) fn certificate_input(input: &DistributionCertificateInput) -> Value {
    json!({
        "certificateP12": input.certificate_p12,
        "certificatePassword": input.certificate_password,
        "appleTeamId": input.apple_team_id,
        "developerPortalIdentifier": input.developer_portal_identifier,
    })
}

pub(crate) fn push_key_input(input: &PushKeyInput) -> Value {
    json!({
        "keyIdentifier": input.key_identifier,
        "keyP8": input.key_p8,
        "appleTeamId": input.apple_team_id,
    })
}

pub(crate) fn profile_input(input: &ProvisioningProfileInput) -> Value {
    json!({
        "provisioningProfile": input.provisioning_profile,
        "developerPortalIdentifier": input.developer_portal_identifier,
        "appleTeamId": input.apple_team_id,
        "distributionCertificateId": input.certificate_id,
        "expiresAt": input.expires_at,
        "deviceUdids": input.device_udids,
    })
}

pub(crate) fn build_credentials_input(input: &BuildCredentialsInput) -> Value {
    json!({
        "distributionType": WireDistributionType::from(input.distribution_type),
        "distributionCertificateId": input.distribution_certificate_id,
        "provisioningProfileId": input.provisioning_profile_id,
        "appleTeamId": input.apple_team_id,
    })
}

pub(crate) fn keystore_input(keystore: &Keystore) -> Value {
    json!({
        "keystore": keystore.keystore,
        "keystorePassword": keystore.keystore_password,
        "keyAlias": keystore.key_alias,
        "keyPassword": keystore.key_password,
    })
}
