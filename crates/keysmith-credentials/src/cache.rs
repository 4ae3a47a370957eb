//! Per-account credential cache in front of the remote store
//!
//! Records are fetched on first use and trusted until a mutation made
//! through the cache refreshes or patches them. Nothing expires on its own.
//! The cache is owned by a single [`Context`](crate::context::Context) and
//! lives for one run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::remote::RemoteStore;
use crate::types::{
    AppCredentials, AppLookupParams, AppleAppIdentifier, AppleTeam, AppleTeamInput,
    BuildCredentials, BuildCredentialsInput, DistributionCertificate,
    DistributionCertificateInput, DistributionType, Keystore, ProvisioningProfile,
    ProvisioningProfileInput, PushKey, PushKeyInput, UserCredential,
};

/// Cached records of one account
#[derive(Debug, Default)]
struct AccountEntry {
    /// Whether the full account listing has been fetched
    prefetched: bool,

    /// App-level records keyed by `"<project-full-name> <bundle-id>"`
    apps: HashMap<String, Arc<AppCredentials>>,

    /// App keys fetched individually and found to have no record
    absent_apps: HashSet<String>,

    /// User-level records keyed by remote id
    users: HashMap<String, Arc<UserCredential>>,
}

/// Point-in-time view of an account's cached records
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    pub app_credentials: Vec<Arc<AppCredentials>>,
    pub user_credentials: Vec<Arc<UserCredential>>,
}

impl AccountSnapshot {
    /// Distribution certificates of the account
    pub fn distribution_certificates(&self) -> Vec<DistributionCertificate> {
        self.user_credentials
            .iter()
            .filter_map(|c| c.as_distribution_certificate().cloned())
            .collect()
    }

    /// Push keys of the account
    pub fn push_keys(&self) -> Vec<PushKey> {
        self.user_credentials
            .iter()
            .filter_map(|c| c.as_push_key().cloned())
            .collect()
    }
}

/// Credential cache keyed by account
pub struct CredentialCache {
    remote: Arc<dyn RemoteStore>,
    accounts: HashMap<String, AccountEntry>,
}

impl CredentialCache {
    /// Create an empty cache in front of `remote`
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            accounts: HashMap::new(),
        }
    }

    /// The remote store behind this cache
    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    /// All records of an account. The first call fetches the full listing;
    /// later calls are served from memory.
    #[instrument(skip(self))]
    pub async fn get_all(&mut self, account: &str) -> Result<AccountSnapshot> {
        let entry = self.accounts.entry(account.to_string()).or_default();

        if !entry.prefetched {
            debug!(account, "fetching all credentials for account");
            let fetched = self.remote.fetch_account_credentials(account).await?;

            entry.apps = fetched
                .app_credentials
                .into_iter()
                .map(|app| (app.cache_key(), Arc::new(app)))
                .collect();
            entry.users = fetched
                .user_credentials
                .into_iter()
                .map(|user| (user.id().to_string(), Arc::new(user)))
                .collect();
            entry.absent_apps.clear();
            entry.prefetched = true;
        }

        let mut apps: Vec<_> = entry.apps.iter().collect();
        apps.sort_by(|a, b| a.0.cmp(b.0));
        let mut users: Vec<_> = entry.users.iter().collect();
        users.sort_by(|a, b| a.0.cmp(b.0));

        Ok(AccountSnapshot {
            app_credentials: apps.into_iter().map(|(_, app)| Arc::clone(app)).collect(),
            user_credentials: users.into_iter().map(|(_, user)| Arc::clone(user)).collect(),
        })
    }

    /// Make sure the app-level record of `app` is cached.
    ///
    /// Does nothing after a full account prefetch or when the app was
    /// already fetched; otherwise fetches just this app.
    pub async fn ensure_app_credentials(&mut self, app: &AppLookupParams) -> Result<()> {
        let key = app.cache_key();
        let entry = self.accounts.entry(app.account.clone()).or_default();

        if entry.prefetched || entry.apps.contains_key(&key) || entry.absent_apps.contains(&key) {
            return Ok(());
        }

        self.refresh_app(app).await
    }

    /// The app-level record of `app`, fetched on miss
    pub async fn app_credentials(
        &mut self,
        app: &AppLookupParams,
    ) -> Result<Option<Arc<AppCredentials>>> {
        self.ensure_app_credentials(app).await?;
        Ok(self
            .accounts
            .get(&app.account)
            .and_then(|entry| entry.apps.get(&app.cache_key()))
            .cloned())
    }

    /// Build credentials of (app, distribution type)
    pub async fn build_credentials(
        &mut self,
        app: &AppLookupParams,
        distribution: DistributionType,
    ) -> Result<Option<BuildCredentials>> {
        Ok(self
            .app_credentials(app)
            .await?
            .and_then(|record| record.build_credentials_for(distribution).cloned()))
    }

    /// Android keystore of `app`
    pub async fn keystore(&mut self, app: &AppLookupParams) -> Result<Option<Keystore>> {
        Ok(self
            .app_credentials(app)
            .await?
            .and_then(|record| record.keystore.clone()))
    }

    /// A user-level record by id, fetched on miss
    pub async fn user_credential(
        &mut self,
        account: &str,
        id: &str,
    ) -> Result<Option<Arc<UserCredential>>> {
        let entry = self.accounts.entry(account.to_string()).or_default();
        if let Some(found) = entry.users.get(id) {
            return Ok(Some(Arc::clone(found)));
        }
        if entry.prefetched {
            return Ok(None);
        }

        debug!(account, id, "fetching user credential");
        self.refresh_user_credential(account, id).await
    }

    /// A distribution certificate by id
    pub async fn distribution_certificate(
        &mut self,
        account: &str,
        id: &str,
    ) -> Result<Option<DistributionCertificate>> {
        Ok(self
            .user_credential(account, id)
            .await?
            .and_then(|c| c.as_distribution_certificate().cloned()))
    }

    /// All distribution certificates of an account
    pub async fn distribution_certificates(
        &mut self,
        account: &str,
    ) -> Result<Vec<DistributionCertificate>> {
        Ok(self.get_all(account).await?.distribution_certificates())
    }

    /// All push keys of an account
    pub async fn push_keys(&mut self, account: &str) -> Result<Vec<PushKey>> {
        Ok(self.get_all(account).await?.push_keys())
    }

    pub async fn create_distribution_certificate(
        &mut self,
        account: &str,
        input: &DistributionCertificateInput,
    ) -> Result<DistributionCertificate> {
        let created = self
            .remote
            .create_distribution_certificate(account, input)
            .await?;
        self.certificate_after_write(account, created).await
    }

    pub async fn update_distribution_certificate(
        &mut self,
        account: &str,
        id: &str,
        input: &DistributionCertificateInput,
    ) -> Result<DistributionCertificate> {
        let updated = self
            .remote
            .update_distribution_certificate(account, id, input)
            .await?;
        self.certificate_after_write(account, updated).await
    }

    /// Delete a certificate and clear every cached reference to it
    pub async fn delete_distribution_certificate(&mut self, account: &str, id: &str) -> Result<()> {
        self.remote
            .delete_distribution_certificate(account, id)
            .await?;
        self.evict_user_credential(account, id);
        Ok(())
    }

    pub async fn create_push_key(
        &mut self,
        account: &str,
        input: &PushKeyInput,
    ) -> Result<PushKey> {
        let created = self.remote.create_push_key(account, input).await?;
        let refreshed = self.refresh_user_credential(account, &created.id).await?;
        Ok(refreshed
            .and_then(|c| c.as_push_key().cloned())
            .unwrap_or(created))
    }

    /// Delete a push key and clear every cached reference to it
    pub async fn delete_push_key(&mut self, account: &str, id: &str) -> Result<()> {
        self.remote.delete_push_key(account, id).await?;
        self.evict_user_credential(account, id);
        Ok(())
    }

    /// Create a profile record. The app record is untouched until the
    /// profile is assigned with [`set_build_credentials`](Self::set_build_credentials).
    pub async fn create_provisioning_profile(
        &mut self,
        app: &AppLookupParams,
        input: &ProvisioningProfileInput,
    ) -> Result<ProvisioningProfile> {
        Ok(self.remote.create_provisioning_profile(app, input).await?)
    }

    pub async fn update_provisioning_profile(
        &mut self,
        app: &AppLookupParams,
        id: &str,
        input: &ProvisioningProfileInput,
    ) -> Result<ProvisioningProfile> {
        let updated = self
            .remote
            .update_provisioning_profile(app, id, input)
            .await?;
        self.refresh_app(app).await?;
        Ok(updated)
    }

    pub async fn delete_provisioning_profile(
        &mut self,
        app: &AppLookupParams,
        id: &str,
    ) -> Result<()> {
        self.remote.delete_provisioning_profile(app, id).await?;
        self.refresh_app(app).await
    }

    /// Assign certificate, profile and team to (app, distribution type)
    pub async fn set_build_credentials(
        &mut self,
        app: &AppLookupParams,
        input: &BuildCredentialsInput,
    ) -> Result<BuildCredentials> {
        let build = self.remote.upsert_build_credentials(app, input).await?;
        self.refresh_app(app).await?;
        // assignment changes the certificate's list of apps
        self.refresh_user_credential(&app.account, &input.distribution_certificate_id)
            .await?;
        Ok(build)
    }

    pub async fn set_keystore(&mut self, app: &AppLookupParams, keystore: &Keystore) -> Result<()> {
        self.remote.set_keystore(app, keystore).await?;
        self.refresh_app(app).await
    }

    pub async fn delete_keystore(&mut self, app: &AppLookupParams) -> Result<()> {
        self.remote.delete_keystore(app).await?;
        self.refresh_app(app).await
    }

    pub async fn create_or_get_apple_team(
        &mut self,
        account: &str,
        team: &AppleTeamInput,
    ) -> Result<AppleTeam> {
        Ok(self.remote.create_or_get_apple_team(account, team).await?)
    }

    pub async fn create_or_get_apple_app_identifier(
        &mut self,
        app: &AppLookupParams,
        team: Option<&AppleTeam>,
    ) -> Result<AppleAppIdentifier> {
        Ok(self
            .remote
            .create_or_get_apple_app_identifier(app, team)
            .await?)
    }

    /// Re-fetch one app record and overwrite its slot
    async fn refresh_app(&mut self, app: &AppLookupParams) -> Result<()> {
        let key = app.cache_key();
        debug!(app = %key, "fetching app credentials");
        let fetched = self.remote.fetch_app_credentials(app).await?;

        let entry = self.accounts.entry(app.account.clone()).or_default();
        match fetched {
            Some(record) => {
                entry.absent_apps.remove(&key);
                entry.apps.insert(key, Arc::new(record));
            }
            None => {
                entry.apps.remove(&key);
                entry.absent_apps.insert(key);
            }
        }
        Ok(())
    }

    /// Re-fetch one user credential by id and overwrite its slot. The remote
    /// store fills in derived fields such as serial numbers.
    async fn refresh_user_credential(
        &mut self,
        account: &str,
        id: &str,
    ) -> Result<Option<Arc<UserCredential>>> {
        let fetched = self.remote.fetch_user_credential(account, id).await?;

        let entry = self.accounts.entry(account.to_string()).or_default();
        match fetched {
            Some(record) => {
                let record = Arc::new(record);
                entry.users.insert(id.to_string(), Arc::clone(&record));
                Ok(Some(record))
            }
            None => {
                entry.users.remove(id);
                Ok(None)
            }
        }
    }

    async fn certificate_after_write(
        &mut self,
        account: &str,
        written: DistributionCertificate,
    ) -> Result<DistributionCertificate> {
        let refreshed = self.refresh_user_credential(account, &written.id).await?;
        Ok(refreshed
            .and_then(|c| c.as_distribution_certificate().cloned())
            .unwrap_or(written))
    }

    /// Drop a deleted user credential and patch app records that pointed at it
    fn evict_user_credential(&mut self, account: &str, id: &str) {
        let Some(entry) = self.accounts.get_mut(account) else {
            return;
        };

        entry.users.remove(id);
        for (key, app) in entry.apps.iter_mut() {
            if app.references(id) {
                debug!(app = %key, id, "clearing reference to deleted credential");
                Arc::make_mut(app).clear_references_to(id);
            }
        }
    }
}
