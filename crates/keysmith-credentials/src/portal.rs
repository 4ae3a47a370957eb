//! Apple developer portal interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AppleTeamInput, Device, DistributionType, ProfileStatus};

/// Developer portal errors
#[derive(Debug, Error)]
pub enum PortalError {
    /// No usable portal session
    #[error("Not authenticated with the Apple Developer Portal: {0}")]
    NotAuthenticated(String),

    /// The team reached its distribution certificate limit
    #[error("The maximum number of distribution certificates has been reached")]
    CertificateLimitReached,

    /// API error from the portal
    #[error("Apple Developer Portal error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Operation not available with this portal client
    #[error("Not supported by this developer portal client: {0}")]
    Unsupported(String),

    /// Transport failure
    #[error("Apple Developer Portal request failed: {0}")]
    Transport(String),
}

/// Result type for portal operations
pub type PortalResult<T> = std::result::Result<T, PortalError>;

/// An authenticated portal session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSession {
    pub team: AppleTeamInput,
}

/// Provisioning profile class on the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileClass {
    AppStore,
    AdHoc,
    InHouse,
    Development,
}

impl From<DistributionType> for ProfileClass {
    fn from(distribution: DistributionType) -> Self {
        match distribution {
            DistributionType::AppStore => Self::AppStore,
            DistributionType::AdHoc => Self::AdHoc,
            DistributionType::Enterprise => Self::InHouse,
            DistributionType::Development => Self::Development,
        }
    }
}

/// A distribution certificate as listed by the portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalCertificate {
    pub id: String,
    pub serial_number: String,
    pub name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PortalCertificate {
    pub fn describe(&self) -> String {
        let expiry = self
            .expires_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "{} (serial {}, expires {})",
            self.name.as_deref().unwrap_or("Distribution certificate"),
            self.serial_number,
            expiry
        )
    }
}

/// A freshly issued distribution certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCertificate {
    /// PKCS#12 blob, base64
    pub certificate_p12: String,
    pub certificate_password: String,
    pub serial_number: String,
    pub developer_portal_identifier: String,
    pub valid_until: Option<DateTime<Utc>>,
}

/// A provisioning profile as listed by the portal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalProfile {
    pub id: String,
    pub name: String,
    pub bundle_identifier: String,
    pub class: ProfileClass,
    pub status: ProfileStatus,
    pub expires_at: Option<DateTime<Utc>>,
    /// Serial numbers of the certificates embedded in the profile
    pub certificate_serials: Vec<String>,
    pub device_udids: Vec<String>,
    /// `.mobileprovision` blob, base64
    pub content: String,
}

impl PortalProfile {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == ProfileStatus::Active && !self.expires_at.is_some_and(|at| at < now)
    }

    pub fn uses_certificate(&self, serial_number: &str) -> bool {
        self.certificate_serials
            .iter()
            .any(|s| s.eq_ignore_ascii_case(serial_number))
    }
}

/// Request to create a provisioning profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequest {
    pub name: String,
    pub bundle_identifier: String,
    pub class: ProfileClass,
    pub certificate_portal_id: String,
    pub device_ids: Vec<String>,
}

/// The authoritative system for Apple code-signing artifacts.
///
/// Listing operations are queries; everything else mutates the portal.
#[async_trait]
pub trait DeveloperPortal: Send + Sync {
    /// Establish a session. Interactive clients may ask for a login.
    async fn authenticate(&self, interactive: bool) -> PortalResult<PortalSession>;

    /// Non-revoked distribution certificates of the team
    async fn list_distribution_certificates(
        &self,
        session: &PortalSession,
    ) -> PortalResult<Vec<PortalCertificate>>;

    async fn create_distribution_certificate(
        &self,
        session: &PortalSession,
    ) -> PortalResult<GeneratedCertificate>;

    async fn revoke_distribution_certificates(
        &self,
        session: &PortalSession,
        ids: &[String],
    ) -> PortalResult<()>;

    async fn list_provisioning_profiles(
        &self,
        session: &PortalSession,
        bundle_identifier: &str,
        class: ProfileClass,
    ) -> PortalResult<Vec<PortalProfile>>;

    async fn create_provisioning_profile(
        &self,
        session: &PortalSession,
        request: &ProfileRequest,
    ) -> PortalResult<PortalProfile>;

    async fn revoke_provisioning_profile(&self, session: &PortalSession, id: &str)
        -> PortalResult<()>;

    async fn list_devices(&self, session: &PortalSession) -> PortalResult<Vec<Device>>;

    async fn register_device(
        &self,
        session: &PortalSession,
        name: &str,
        udid: &str,
    ) -> PortalResult<Device>;

    /// Make sure the bundle identifier is registered for the team
    async fn ensure_bundle_identifier(
        &self,
        session: &PortalSession,
        bundle_identifier: &str,
    ) -> PortalResult<()>;
}
