//! [`DeveloperPortal`] over the App Store Connect API

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keysmith_core::AppleConfig;
use keysmith_credentials::portal::{
    DeveloperPortal, GeneratedCertificate, PortalCertificate, PortalError, PortalProfile,
    PortalResult, PortalSession, ProfileClass, ProfileRequest,
};
use keysmith_credentials::types::{AppleTeamInput, Device};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, instrument};

use super::connect::{ApiKey, ConnectClient};
use super::pkcs12;
use super::resources::{self, Document, Resource};
use crate::error::{Result, StoreError};

const PROFILE_INCLUDES: &str = "include=bundleId,certificates,devices&limit[certificates]=50&limit[devices]=50";

/// Certificate signing request used for new distribution certificates
#[derive(Debug, Clone)]
pub struct SigningRequest {
    /// PEM contents of the CSR
    pub csr: String,
    /// Private key the CSR was made with
    pub key_path: PathBuf,
}

/// Apple Developer Portal client authenticated with an App Store Connect
/// API key
pub struct AppStoreConnectPortal {
    client: ConnectClient,
    team: AppleTeamInput,
    signing_request: Option<SigningRequest>,
}

impl AppStoreConnectPortal {
    pub fn new(client: ConnectClient, team: AppleTeamInput) -> Self {
        Self {
            client,
            team,
            signing_request: None,
        }
    }

    pub fn with_signing_request(mut self, signing_request: SigningRequest) -> Self {
        self.signing_request = Some(signing_request);
        self
    }

    /// Build a portal client from the `[apple]` configuration section
    pub fn from_config(config: &AppleConfig, project_dir: &Path) -> Result<Self> {
        let key = ApiKey::from_config(config, project_dir)?;
        let team = AppleTeamInput {
            team_identifier: config.team_id.clone(),
            team_name: config.team_name.clone(),
        };
        let mut portal = Self::new(ConnectClient::new(key), team);

        if let (Some(csr_path), Some(key_path)) = (&config.csr_path, &config.csr_key_path) {
            let csr_path = project_dir.join(csr_path);
            let csr = std::fs::read_to_string(&csr_path).map_err(|e| {
                StoreError::ConfigurationError(format!(
                    "Failed to read signing request {}: {}",
                    csr_path.display(),
                    e
                ))
            })?;
            portal = portal.with_signing_request(SigningRequest {
                csr,
                key_path: project_dir.join(key_path),
            });
        }
        Ok(portal)
    }

    async fn bundle_id_resource(&self, identifier: &str) -> Result<Option<Resource>> {
        let doc: Document<Vec<Resource>> = self
            .client
            .request(
                Method::GET,
                &format!("/bundleIds?filter[identifier]={identifier}&filter[platform]=IOS"),
                None,
            )
            .await?;
        // the filter matches prefixes
        Ok(doc
            .data
            .into_iter()
            .find(|r| r.attr("identifier") == Some(identifier)))
    }

    async fn fetch_profile(&self, id: &str) -> Result<PortalProfile> {
        let doc: Document<Resource> = self
            .client
            .request(Method::GET, &format!("/profiles/{id}?{PROFILE_INCLUDES}"), None)
            .await?;
        resources::profile(&doc.data, &doc.included)
            .ok_or_else(|| StoreError::NotFound(format!("profile {id} is incomplete")))
    }
}

fn bundle_id_name(identifier: &str) -> String {
    let name: String = identifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    format!("keysmith {}", name.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[async_trait]
impl DeveloperPortal for AppStoreConnectPortal {
    /// API keys need no login; `interactive` is ignored.
    async fn authenticate(&self, _interactive: bool) -> PortalResult<PortalSession> {
        let _: Document<Vec<Resource>> = self
            .client
            .request(Method::GET, "/certificates?limit=1", None)
            .await
            .map_err(|e| PortalError::NotAuthenticated(e.to_string()))?;
        info!(team = %self.team.team_identifier, "authenticated with App Store Connect");
        Ok(PortalSession {
            team: self.team.clone(),
        })
    }

    async fn list_distribution_certificates(
        &self,
        _session: &PortalSession,
    ) -> PortalResult<Vec<PortalCertificate>> {
        let doc: Document<Vec<Resource>> = self
            .client
            .request(
                Method::GET,
                "/certificates?filter[certificateType]=DISTRIBUTION,IOS_DISTRIBUTION&limit=200",
                None,
            )
            .await?;
        Ok(doc.data.iter().filter_map(resources::certificate).collect())
    }

    #[instrument(skip_all)]
    async fn create_distribution_certificate(
        &self,
        _session: &PortalSession,
    ) -> PortalResult<GeneratedCertificate> {
        let request = self.signing_request.as_ref().ok_or_else(|| {
            PortalError::Unsupported(
                "issuing certificates needs apple.csr_path and apple.csr_key_path".to_string(),
            )
        })?;

        let doc: Document<Resource> = self
            .client
            .request(
                Method::POST,
                "/certificates",
                Some(json!({
                    "data": {
                        "type": "certificates",
                        "attributes": {
                            "certificateType": "DISTRIBUTION",
                            "csrContent": request.csr,
                        }
                    }
                })),
            )
            .await?;

        let resource = doc.data;
        let content = resource.attr("certificateContent").ok_or_else(|| PortalError::Api {
            status: 200,
            message: "certificate response has no content".to_string(),
        })?;
        let password = pkcs12::random_password();
        let certificate_p12 = pkcs12::export(content, &request.key_path, &password).await?;
        let portal_certificate = resources::certificate(&resource).ok_or_else(|| PortalError::Api {
            status: 200,
            message: "certificate response has no serial number".to_string(),
        })?;

        debug!(id = %portal_certificate.id, "issued distribution certificate");
        Ok(GeneratedCertificate {
            certificate_p12,
            certificate_password: password,
            serial_number: portal_certificate.serial_number,
            developer_portal_identifier: portal_certificate.id,
            valid_until: portal_certificate.expires_at,
        })
    }

    async fn revoke_distribution_certificates(
        &self,
        _session: &PortalSession,
        ids: &[String],
    ) -> PortalResult<()> {
        for id in ids {
            info!(id = %id, "revoking distribution certificate");
            self.client
                .request_no_content(Method::DELETE, &format!("/certificates/{id}"), None)
                .await?;
        }
        Ok(())
    }

    async fn list_provisioning_profiles(
        &self,
        _session: &PortalSession,
        bundle_identifier: &str,
        class: ProfileClass,
    ) -> PortalResult<Vec<PortalProfile>> {
        let doc: Document<Vec<Resource>> = self
            .client
            .request(
                Method::GET,
                &format!(
                    "/profiles?filter[profileType]={}&{PROFILE_INCLUDES}&limit=200",
                    resources::profile_type(class)
                ),
                None,
            )
            .await?;
        Ok(doc
            .data
            .iter()
            .filter_map(|r| resources::profile(r, &doc.included))
            .filter(|p| p.bundle_identifier == bundle_identifier)
            .collect())
    }

    #[instrument(skip_all, fields(bundle = %request.bundle_identifier))]
    async fn create_provisioning_profile(
        &self,
        _session: &PortalSession,
        request: &ProfileRequest,
    ) -> PortalResult<PortalProfile> {
        let bundle = self
            .bundle_id_resource(&request.bundle_identifier)
            .await?
            .ok_or_else(|| PortalError::Api {
                status: 404,
                message: format!(
                    "bundle identifier {} is not registered",
                    request.bundle_identifier
                ),
            })?;

        let devices: Vec<_> = request
            .device_ids
            .iter()
            .map(|id| json!({ "type": "devices", "id": id }))
            .collect();
        let doc: Document<Resource> = self
            .client
            .request(
                Method::POST,
                "/profiles",
                Some(json!({
                    "data": {
                        "type": "profiles",
                        "attributes": {
                            "name": request.name,
                            "profileType": resources::profile_type(request.class),
                        },
                        "relationships": {
                            "bundleId": { "data": { "type": "bundleIds", "id": bundle.id } },
                            "certificates": {
                                "data": [{ "type": "certificates", "id": request.certificate_portal_id }]
                            },
                            "devices": { "data": devices },
                        }
                    }
                })),
            )
            .await?;

        Ok(self.fetch_profile(&doc.data.id).await?)
    }

    async fn revoke_provisioning_profile(
        &self,
        _session: &PortalSession,
        id: &str,
    ) -> PortalResult<()> {
        info!(id, "deleting provisioning profile");
        self.client
            .request_no_content(Method::DELETE, &format!("/profiles/{id}"), None)
            .await?;
        Ok(())
    }

    async fn list_devices(&self, _session: &PortalSession) -> PortalResult<Vec<Device>> {
        let doc: Document<Vec<Resource>> = self
            .client
            .request(
                Method::GET,
                "/devices?filter[platform]=IOS&filter[status]=ENABLED&limit=200",
                None,
            )
            .await?;
        Ok(doc.data.iter().filter_map(resources::device).collect())
    }

    async fn register_device(
        &self,
        _session: &PortalSession,
        name: &str,
        udid: &str,
    ) -> PortalResult<Device> {
        let doc: Document<Resource> = self
            .client
            .request(
                Method::POST,
                "/devices",
                Some(json!({
                    "data": {
                        "type": "devices",
                        "attributes": { "name": name, "udid": udid, "platform": "IOS" }
                    }
                })),
            )
            .await?;
        resources::device(&doc.data).ok_or_else(|| PortalError::Api {
            status: 200,
            message: "device response has no UDID".to_string(),
        })
    }

    async fn ensure_bundle_identifier(
        &self,
        _session: &PortalSession,
        bundle_identifier: &str,
    ) -> PortalResult<()> {
        if self.bundle_id_resource(bundle_identifier).await?.is_some() {
            return Ok(());
        }
        info!(bundle_identifier, "registering bundle identifier");
        let _: Document<Resource> = self
            .client
            .request(
                Method::POST,
                "/bundleIds",
                Some(json!({
                    "data": {
                        "type": "bundleIds",
                        "attributes": {
                            "identifier": bundle_identifier,
                            "name": bundle_id_name(bundle_identifier),
                            "platform": "IOS",
                        }
                    }
                })),
            )
            .await?;
        Ok(())
    }
}
