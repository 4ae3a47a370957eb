use async_trait::async_trait;
use keysmith_credentials::portal::{
    DeveloperPortal, GeneratedCertificate, PortalCertificate, PortalError, PortalProfile,
    PortalResult, PortalSession, ProfileClass, ProfileRequest,
};
use keysmith_credentials::types::Device;

/// Developer portal used when the project has no `[apple]` section.
///
/// Authentication always fails, so validation reports `Unknown` and setup
/// steps that need the portal stop with a clear error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredPortal;

fn not_configured<T>() -> PortalResult<T> {
    Err(PortalError::NotAuthenticated(
        "no App Store Connect API key configured; add an [apple] section to keysmith.toml"
            .to_string(),
    ))
}

#[async_trait]
impl DeveloperPortal for UnconfiguredPortal {
    async fn authenticate(&self, _interactive: bool) -> PortalResult<PortalSession> {
        not_configured()
    }

    async fn list_distribution_certificates(
        &self,
        _session: &PortalSession,
    ) -> PortalResult<Vec<PortalCertificate>> {
        not_configured()
    }

    async fn create_distribution_certificate(
        &self,
        _session: &PortalSession,
    ) -> PortalResult<GeneratedCertificate> {
        not_configured()
    }

    async fn revoke_distribution_certificates(
        &self,
        _session: &PortalSession,
        _ids: &[String],
    ) -> PortalResult<()> {
        not_configured()
    }

    async fn list_provisioning_profiles(
        &self,
        _session: &PortalSession,
        _bundle_identifier: &str,
        _class: ProfileClass,
    ) -> PortalResult<Vec<PortalProfile>> {
        not_configured()
    }

    async fn create_provisioning_profile(
        &self,
        _session: &PortalSession,
        _request: &ProfileRequest,
    ) -> PortalResult<PortalProfile> {
        not_configured()
    }

    async fn revoke_provisioning_profile(
        &self,
        _session: &PortalSession,
        _id: &str,
    ) -> PortalResult<()> {
        not_configured()
    }

    async fn list_devices(&self, _session: &PortalSession) -> PortalResult<Vec<Device>> {
        not_configured()
    }

    async fn register_device(
        &self,
        _session: &PortalSession,
        _name: &str,
        _udid: &str,
    ) -> PortalResult<Device> {
        not_configured()
    }

    async fn ensure_bundle_identifier(
        &self,
        _session: &PortalSession,
        _bundle_identifier: &str,
    ) -> PortalResult<()> {
        not_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authentication_fails() {
        let err = UnconfiguredPortal.authenticate(true).await.unwrap_err();
        assert!(matches!(err, PortalError::NotAuthenticated(_)));
    }
}
