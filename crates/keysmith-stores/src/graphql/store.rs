//! [`RemoteStore`] over the credential store's GraphQL API

use async_trait::async_trait;
use keysmith_credentials::remote::{RemoteError, RemoteResult, RemoteStore};
use keysmith_credentials::types::{
    AccountCredentials, AppCredentials, AppLookupParams, AppleAppIdentifier, AppleTeam,
    AppleTeamInput, BuildCredentials, BuildCredentialsInput, DistributionCertificate,
    DistributionCertificateInput, Keystore, ProvisioningProfile, ProvisioningProfileInput, PushKey,
    PushKeyInput, UserCredential,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::instrument;

use super::client::GraphqlClient;
use super::documents;
use super::wire::{self, AccountData, AppData, Mutation, RecordId, UserCredentialData};

/// Remote credential store backed by the GraphQL API
pub struct GraphqlRemoteStore {
    client: GraphqlClient,
}

impl GraphqlRemoteStore {
    pub fn new(client: GraphqlClient) -> Self {
        Self { client }
    }

    async fn mutate<T: DeserializeOwned>(
        &self,
        operation: &str,
        document: &str,
        variables: Value,
    ) -> RemoteResult<T> {
        let data: Mutation<T> = self.client.request(operation, document, variables).await?;
        data.record
            .ok_or_else(|| RemoteError::Api(format!("{operation} returned no record")))
    }
}

#[async_trait]
impl RemoteStore for GraphqlRemoteStore {
    #[instrument(skip(self))]
    async fn fetch_account_credentials(&self, account: &str) -> RemoteResult<AccountCredentials> {
        let data: AccountData = self
            .client
            .request(
                "AccountCredentials",
                documents::ACCOUNT_CREDENTIALS,
                json!({ "accountName": account }),
            )
            .await?;
        let account_data = data
            .account
            .ok_or_else(|| RemoteError::NotFound(format!("account {account}")))?;

        let user_credentials = account_data
            .distribution_certificates
            .into_iter()
            .map(|c| UserCredential::DistributionCertificate(c.into()))
            .chain(account_data.push_keys.into_iter().map(UserCredential::PushKey))
            .collect();
        Ok(AccountCredentials {
            app_credentials: account_data
                .app_credentials
                .into_iter()
                .map(Into::into)
                .collect(),
            user_credentials,
        })
    }

    #[instrument(skip_all, fields(app = %app))]
    async fn fetch_app_credentials(
        &self,
        app: &AppLookupParams,
    ) -> RemoteResult<Option<AppCredentials>> {
        let data: AppData = self
            .client
            .request(
                "AppCredentials",
                documents::APP_CREDENTIALS,
                json!({ "app": wire::app_variable(app) }),
            )
            .await?;
        Ok(data.app_credentials.map(Into::into))
    }

    async fn fetch_user_credential(
        &self,
        account: &str,
        id: &str,
    ) -> RemoteResult<Option<UserCredential>> {
        let data: UserCredentialData = self
            .client
            .request(
                "UserCredential",
                documents::USER_CREDENTIAL,
                json!({ "accountName": account, "id": id }),
            )
            .await?;
        let Some(found) = data.account else {
            return Ok(None);
        };
        Ok(found
            .distribution_certificate
            .map(|c| UserCredential::DistributionCertificate(c.into()))
            .or_else(|| found.push_key.map(UserCredential::PushKey)))
    }

    async fn create_distribution_certificate(
        &self,
        account: &str,
        input: &DistributionCertificateInput,
    ) -> RemoteResult<DistributionCertificate> {
        let record: wire::WireCertificate = self
            .mutate(
                "CreateDistributionCertificate",
                documents::CREATE_DISTRIBUTION_CERTIFICATE,
                json!({ "accountName": account, "input": wire::certificate_input(input) }),
            )
            .await?;
        Ok(record.into())
    }

    async fn update_distribution_certificate(
        &self,
        _account: &str,
        id: &str,
        input: &DistributionCertificateInput,
    ) -> RemoteResult<DistributionCertificate> {
        let record: wire::WireCertificate = self
            .mutate(
                "UpdateDistributionCertificate",
                documents::UPDATE_DISTRIBUTION_CERTIFICATE,
                json!({ "id": id, "input": wire::certificate_input(input) }),
            )
            .await?;
        Ok(record.into())
    }

    async fn delete_distribution_certificate(&self, _account: &str, id: &str) -> RemoteResult<()> {
        let _: RecordId = self
            .mutate(
                "DeleteDistributionCertificate",
                documents::DELETE_DISTRIBUTION_CERTIFICATE,
                json!({ "id": id }),
            )
            .await?;
        Ok(())
    }

    async fn create_push_key(&self, account: &str, input: &PushKeyInput) -> RemoteResult<PushKey> {
        self.mutate(
            "CreatePushKey",
            documents::CREATE_PUSH_KEY,
            json!({ "accountName": account, "input": wire::push_key_input(input) }),
        )
        .await
    }

    async fn delete_push_key(&self, _account: &str, id: &str) -> RemoteResult<()> {
        let _: RecordId = self
            .mutate("DeletePushKey", documents::DELETE_PUSH_KEY, json!({ "id": id }))
            .await?;
        Ok(())
    }

    async fn create_provisioning_profile(
        &self,
        app: &AppLookupParams,
        input: &ProvisioningProfileInput,
    ) -> RemoteResult<ProvisioningProfile> {
        let record: wire::WireProfile = self
            .mutate(
                "CreateProvisioningProfile",
                documents::CREATE_PROVISIONING_PROFILE,
                json!({ "app": wire::app_variable(app), "input": wire::profile_input(input) }),
            )
            .await?;
        Ok(record.into())
    }

    async fn update_provisioning_profile(
        &self,
        _app: &AppLookupParams,
        id: &str,
        input: &ProvisioningProfileInput,
    ) -> RemoteResult<ProvisioningProfile> {
        let record: wire::WireProfile = self
            .mutate(
                "UpdateProvisioningProfile",
                documents::UPDATE_PROVISIONING_PROFILE,
                json!({ "id": id, "input": wire::profile_input(input) }),
            )
            .await?;
        Ok(record.into())
    }

    async fn delete_provisioning_profile(
        &self,
        _app: &AppLookupParams,
        id: &str,
    ) -> RemoteResult<()> {
        let _: RecordId = self
            .mutate(
                "DeleteProvisioningProfile",
                documents::DELETE_PROVISIONING_PROFILE,
                json!({ "id": id }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(app = %app, distribution = %input.distribution_type))]
    async fn upsert_build_credentials(
        &self,
        app: &AppLookupParams,
        input: &BuildCredentialsInput,
    ) -> RemoteResult<BuildCredentials> {
        let record: wire::WireBuildCredentials = self
            .mutate(
                "UpsertBuildCredentials",
                documents::UPSERT_BUILD_CREDENTIALS,
                json!({
                    "app": wire::app_variable(app),
                    "input": wire::build_credentials_input(input),
                }),
            )
            .await?;
        Ok(record.into())
    }

    async fn create_or_get_apple_team(
        &self,
        account: &str,
        team: &AppleTeamInput,
    ) -> RemoteResult<AppleTeam> {
        self.mutate(
            "CreateOrGetAppleTeam",
            documents::CREATE_OR_GET_APPLE_TEAM,
            json!({
                "accountName": account,
                "input": {
                    "appleTeamIdentifier": team.team_identifier,
                    "appleTeamName": team.team_name,
                },
            }),
        )
        .await
    }

    async fn create_or_get_apple_app_identifier(
        &self,
        app: &AppLookupParams,
        team: Option<&AppleTeam>,
    ) -> RemoteResult<AppleAppIdentifier> {
        self.mutate(
            "CreateOrGetAppleAppIdentifier",
            documents::CREATE_OR_GET_APPLE_APP_IDENTIFIER,
            json!({
                "app": wire::app_variable(app),
                "appleTeamId": team.map(|t| t.id.as_str()),
            }),
        )
        .await
    }

    async fn set_keystore(&self, app: &AppLookupParams, keystore: &Keystore) -> RemoteResult<()> {
        let _: RecordId = self
            .mutate(
                "SetKeystore",
                documents::SET_KEYSTORE,
                json!({ "app": wire::app_variable(app), "input": wire::keystore_input(keystore) }),
            )
            .await?;
        Ok(())
    }

    async fn delete_keystore(&self, app: &AppLookupParams) -> RemoteResult<()> {
        let _: RecordId = self
            .mutate(
                "DeleteKeystore",
                documents::DELETE_KEYSTORE,
                json!({ "app": wire::app_variable(app) }),
            )
            .await?;
        Ok(())
    }
}
