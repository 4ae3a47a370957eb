//! Remote credential store interface

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    AccountCredentials, AppCredentials, AppLookupParams, AppleAppIdentifier, AppleTeam,
    AppleTeamInput, BuildCredentials, BuildCredentialsInput, DistributionCertificate,
    DistributionCertificateInput, Keystore, ProvisioningProfile, ProvisioningProfileInput, PushKey,
    PushKeyInput, UserCredential,
};

/// Remote store errors
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Not authenticated with the remote store
    #[error("Not logged in to the credential store: {0}")]
    Unauthenticated(String),

    /// The store answered with errors
    #[error("Credential store error: {0}")]
    Api(String),

    /// Record not found
    #[error("Credential store record not found: {0}")]
    NotFound(String),

    /// Transport failure
    #[error("Credential store request failed: {0}")]
    Transport(String),
}

/// Result type for remote store operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The backend service holding durable credential records.
///
/// Implementations are plain request/response clients: they do not cache.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every app-level and user-level record of an account
    async fn fetch_account_credentials(&self, account: &str) -> RemoteResult<AccountCredentials>;

    /// Fetch the app-level record of one app
    async fn fetch_app_credentials(
        &self,
        app: &AppLookupParams,
    ) -> RemoteResult<Option<AppCredentials>>;

    /// Fetch one user-level record by id
    async fn fetch_user_credential(
        &self,
        account: &str,
        id: &str,
    ) -> RemoteResult<Option<UserCredential>>;

    async fn create_distribution_certificate(
        &self,
        account: &str,
        input: &DistributionCertificateInput,
    ) -> RemoteResult<DistributionCertificate>;

    async fn update_distribution_certificate(
        &self,
        account: &str,
        id: &str,
        input: &DistributionCertificateInput,
    ) -> RemoteResult<DistributionCertificate>;

    /// Delete a certificate. Provisioning profiles generated for it are
    /// deleted along with it.
    async fn delete_distribution_certificate(&self, account: &str, id: &str) -> RemoteResult<()>;

    async fn create_push_key(&self, account: &str, input: &PushKeyInput) -> RemoteResult<PushKey>;

    async fn delete_push_key(&self, account: &str, id: &str) -> RemoteResult<()>;

    async fn create_provisioning_profile(
        &self,
        app: &AppLookupParams,
        input: &ProvisioningProfileInput,
    ) -> RemoteResult<ProvisioningProfile>;

    async fn update_provisioning_profile(
        &self,
        app: &AppLookupParams,
        id: &str,
        input: &ProvisioningProfileInput,
    ) -> RemoteResult<ProvisioningProfile>;

    async fn delete_provisioning_profile(&self, app: &AppLookupParams, id: &str)
        -> RemoteResult<()>;

    /// Create or replace the build credentials of (app, distribution type)
    async fn upsert_build_credentials(
        &self,
        app: &AppLookupParams,
        input: &BuildCredentialsInput,
    ) -> RemoteResult<BuildCredentials>;

    async fn create_or_get_apple_team(
        &self,
        account: &str,
        team: &AppleTeamInput,
    ) -> RemoteResult<AppleTeam>;

    async fn create_or_get_apple_app_identifier(
        &self,
        app: &AppLookupParams,
        team: Option<&AppleTeam>,
    ) -> RemoteResult<AppleAppIdentifier>;

    async fn set_keystore(&self, app: &AppLookupParams, keystore: &Keystore) -> RemoteResult<()>;

    async fn delete_keystore(&self, app: &AppLookupParams) -> RemoteResult<()>;

    /// Whether the store can hold distinct credentials per build target of
    /// one project
    fn supports_multi_target(&self) -> bool {
        true
    }
}
