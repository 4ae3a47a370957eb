//! In-memory collaborators for tests

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};

use crate::context::{Actor, Context};
use crate::portal::{
    DeveloperPortal, GeneratedCertificate, PortalCertificate, PortalError, PortalProfile,
    PortalResult, PortalSession, ProfileClass, ProfileRequest,
};
use crate::prompt::{PromptResult, Prompter};
use crate::provisioning::sample_profile_bytes;
use crate::remote::{RemoteResult, RemoteStore};
use crate::types::*;

pub const TEAM_ID: &str = "TEAM123";

#[derive(Debug, Default)]
struct CallLog(Mutex<HashMap<&'static str, usize>>);

impl CallLog {
    fn record(&self, name: &'static str) {
        *self.0.lock().unwrap().entry(name).or_default() += 1;
    }

    fn get(&self, name: &str) -> usize {
        self.0.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn sum(&self, names: &[&str]) -> usize {
        names.iter().map(|n| self.get(n)).sum()
    }
}

pub fn apple_team() -> AppleTeam {
    AppleTeam {
        id: "team-1".to_string(),
        team_identifier: TEAM_ID.to_string(),
        team_name: Some("Acme Inc".to_string()),
    }
}

/// p12 blob the fakes derive the serial number from
pub fn p12_for_serial(serial: &str) -> String {
    BASE64.encode(format!("p12-{serial}"))
}

fn serial_from_p12(p12: &str) -> Option<String> {
    let bytes = BASE64.decode(p12.trim()).ok()?;
    String::from_utf8(bytes)
        .ok()?
        .strip_prefix("p12-")
        .map(str::to_string)
}

pub fn certificate(id: &str, serial: &str) -> DistributionCertificate {
    DistributionCertificate {
        id: id.to_string(),
        certificate_p12: p12_for_serial(serial),
        certificate_password: "secret".to_string(),
        serial_number: Some(serial.to_string()),
        apple_team: Some(apple_team()),
        valid_from: Some(Utc::now() - Duration::days(30)),
        valid_until: Some(Utc::now() + Duration::days(335)),
        developer_portal_identifier: Some(format!("portal-{id}")),
        assigned_apps: Vec::new(),
    }
}

pub fn app_record(app: &AppLookupParams) -> AppCredentials {
    AppCredentials {
        id: "app-1".to_string(),
        project_full_name: app.project_full_name(),
        bundle_identifier: app.bundle_identifier.clone(),
        parent_bundle_identifier: app.parent_bundle_identifier.clone(),
        push_key_id: None,
        build_credentials: BTreeMap::new(),
        keystore: None,
    }
}

pub fn device(udid: &str) -> Device {
    Device {
        id: format!("dev-{udid}"),
        udid: udid.to_string(),
        name: Some(format!("iPhone {udid}")),
    }
}

pub fn profile_content(devices: &[&str]) -> String {
    BASE64.encode(sample_profile_bytes(TEAM_ID, devices))
}

pub fn portal_profile(id: &str, bundle: &str, serial: &str, devices: &[&str]) -> PortalProfile {
    PortalProfile {
        id: id.to_string(),
        name: format!("{bundle} profile"),
        bundle_identifier: bundle.to_string(),
        class: if devices.is_empty() {
            ProfileClass::AppStore
        } else {
            ProfileClass::AdHoc
        },
        status: ProfileStatus::Active,
        expires_at: Some(Utc::now() + Duration::days(300)),
        certificate_serials: vec![serial.to_string()],
        device_udids: devices.iter().map(|d| d.to_string()).collect(),
        content: profile_content(devices),
    }
}

pub fn profile_with_devices(
    id: &str,
    portal_id: &str,
    certificate_id: &str,
    devices: &[&str],
) -> ProvisioningProfile {
    ProvisioningProfile {
        id: id.to_string(),
        provisioning_profile: profile_content(devices),
        developer_portal_identifier: Some(portal_id.to_string()),
        status: Some(ProfileStatus::Active),
        expires_at: Some(Utc::now() + Duration::days(300)),
        apple_team: Some(apple_team()),
        certificate_id: Some(certificate_id.to_string()),
        device_udids: devices.iter().map(|d| d.to_string()).collect(),
    }
}

/// App record with one build credentials entry
pub fn app_with_build(
    app: &AppLookupParams,
    distribution: DistributionType,
    certificate_id: &str,
    profile: ProvisioningProfile,
) -> AppCredentials {
    let mut record = app_record(app);
    record.build_credentials.insert(
        distribution,
        BuildCredentials {
            id: "bc-1".to_string(),
            distribution_type: distribution,
            distribution_certificate_id: Some(certificate_id.to_string()),
            provisioning_profile: Some(profile),
            apple_team: Some(apple_team()),
        },
    );
    record
}

#[derive(Debug, Default)]
struct RemoteState {
    apps: HashMap<String, (String, AppCredentials)>,
    users: HashMap<String, BTreeMap<String, UserCredential>>,
    profiles: HashMap<String, ProvisioningProfile>,
    teams: HashMap<String, AppleTeam>,
    next_id: u32,
}

impl RemoteState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", 100 + self.next_id)
    }

    fn team_by_id(&self, id: Option<&String>) -> Option<AppleTeam> {
        let id = id?;
        self.teams.values().find(|t| &t.id == id).cloned()
    }

    fn app_entry(&mut self, app: &AppLookupParams) -> &mut AppCredentials {
        let key = app.cache_key();
        if !self.apps.contains_key(&key) {
            let id = self.next_id("app");
            let mut record = app_record(app);
            record.id = id;
            self.apps.insert(key.clone(), (app.account.clone(), record));
        }
        &mut self.apps.get_mut(&key).unwrap().1
    }

    /// Fills in what the real store derives on read
    fn enrich(&self, credential: &UserCredential) -> UserCredential {
        let mut credential = credential.clone();
        if let UserCredential::DistributionCertificate(cert) = &mut credential {
            if cert.serial_number.is_none() {
                cert.serial_number = Some(
                    serial_from_p12(&cert.certificate_p12)
                        .unwrap_or_else(|| format!("SERIAL-{}", cert.id)),
                );
            }
            let mut assigned: Vec<String> = self
                .apps
                .values()
                .filter(|(_, app)| {
                    app.build_credentials
                        .values()
                        .any(|b| b.distribution_certificate_id.as_deref() == Some(&cert.id))
                })
                .map(|(_, app)| app.cache_key())
                .collect();
            assigned.sort();
            cert.assigned_apps = assigned;
        }
        credential
    }
}

const REMOTE_MUTATIONS: &[&str] = &[
    "create_distribution_certificate",
    "update_distribution_certificate",
    "delete_distribution_certificate",
    "create_push_key",
    "delete_push_key",
    "create_provisioning_profile",
    "update_provisioning_profile",
    "delete_provisioning_profile",
    "upsert_build_credentials",
    "set_keystore",
    "delete_keystore",
];

/// Remote store backed by maps, counting every call
#[derive(Debug)]
pub struct FakeRemoteStore {
    state: Mutex<RemoteState>,
    calls: CallLog,
    multi_target: bool,
}

impl FakeRemoteStore {
    pub fn new() -> Self {
        let mut state = RemoteState::default();
        let team = apple_team();
        state.teams.insert(team.team_identifier.clone(), team);
        Self {
            state: Mutex::new(state),
            calls: CallLog::default(),
            multi_target: true,
        }
    }

    /// A store that keeps one set of credentials per project
    pub fn single_target() -> Self {
        Self {
            multi_target: false,
            ..Self::new()
        }
    }

    pub fn insert_certificate(&self, account: &str, cert: DistributionCertificate) {
        self.state
            .lock()
            .unwrap()
            .users
            .entry(account.to_string())
            .or_default()
            .insert(cert.id.clone(), UserCredential::DistributionCertificate(cert));
    }

    pub fn insert_push_key(&self, account: &str, key: PushKey) {
        self.state
            .lock()
            .unwrap()
            .users
            .entry(account.to_string())
            .or_default()
            .insert(key.id.clone(), UserCredential::PushKey(key));
    }

    pub fn insert_app(&self, app: &AppLookupParams, record: AppCredentials) {
        let mut state = self.state.lock().unwrap();
        for build in record.build_credentials.values() {
            if let Some(profile) = &build.provisioning_profile {
                state.profiles.insert(profile.id.clone(), profile.clone());
            }
        }
        state
            .apps
            .insert(app.cache_key(), (app.account.clone(), record));
    }

    pub fn app(&self, app: &AppLookupParams) -> Option<AppCredentials> {
        self.state
            .lock()
            .unwrap()
            .apps
            .get(&app.cache_key())
            .map(|(_, record)| record.clone())
    }

    pub fn certificate_ids(&self, account: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(account)
            .map(|users| {
                users
                    .values()
                    .filter_map(|u| u.as_distribution_certificate().map(|c| c.id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_profile(&self, id: &str) -> bool {
        self.state.lock().unwrap().profiles.contains_key(id)
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.get(name)
    }

    /// Number of mutating calls
    pub fn mutations(&self) -> usize {
        self.calls.sum(REMOTE_MUTATIONS)
    }
}

#[async_trait]
impl RemoteStore for FakeRemoteStore {
    async fn fetch_account_credentials(&self, account: &str) -> RemoteResult<AccountCredentials> {
        self.calls.record("fetch_account_credentials");
        let state = self.state.lock().unwrap();
        let app_credentials = state
            .apps
            .values()
            .filter(|(owner, _)| owner == account)
            .map(|(_, record)| record.clone())
            .collect();
        let user_credentials = state
            .users
            .get(account)
            .map(|users| users.values().map(|u| state.enrich(u)).collect())
            .unwrap_or_default();
        Ok(AccountCredentials {
            app_credentials,
            user_credentials,
        })
    }

    async fn fetch_app_credentials(
        &self,
        app: &AppLookupParams,
    ) -> RemoteResult<Option<AppCredentials>> {
        self.calls.record("fetch_app_credentials");
        Ok(self.app(app))
    }

    async fn fetch_user_credential(
        &self,
        account: &str,
        id: &str,
    ) -> RemoteResult<Option<UserCredential>> {
        self.calls.record("fetch_user_credential");
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .get(account)
            .and_then(|users| users.get(id))
            .map(|u| state.enrich(u)))
    }

    async fn create_distribution_certificate(
        &self,
        account: &str,
        input: &DistributionCertificateInput,
    ) -> RemoteResult<DistributionCertificate> {
        self.calls.record("create_distribution_certificate");
        let mut state = self.state.lock().unwrap();
        let cert = DistributionCertificate {
            id: state.next_id("cert"),
            certificate_p12: input.certificate_p12.clone(),
            certificate_password: input.certificate_password.clone(),
            serial_number: None,
            apple_team: state.team_by_id(input.apple_team_id.as_ref()),
            valid_from: Some(Utc::now()),
            valid_until: Some(Utc::now() + Duration::days(365)),
            developer_portal_identifier: input.developer_portal_identifier.clone(),
            assigned_apps: Vec::new(),
        };
        state
            .users
            .entry(account.to_string())
            .or_default()
            .insert(cert.id.clone(), UserCredential::DistributionCertificate(cert.clone()));
        Ok(cert)
    }

    async fn update_distribution_certificate(
        &self,
        account: &str,
        id: &str,
        input: &DistributionCertificateInput,
    ) -> RemoteResult<DistributionCertificate> {
        self.calls.record("update_distribution_certificate");
        let mut state = self.state.lock().unwrap();
        let team = state.team_by_id(input.apple_team_id.as_ref());
        let Some(UserCredential::DistributionCertificate(cert)) = state
            .users
            .get_mut(account)
            .and_then(|users| users.get_mut(id))
        else {
            return Err(crate::remote::RemoteError::NotFound(id.to_string()));
        };
        cert.certificate_p12 = input.certificate_p12.clone();
        cert.certificate_password = input.certificate_password.clone();
        cert.serial_number = None;
        cert.apple_team = team;
        cert.developer_portal_identifier = input.developer_portal_identifier.clone();
        Ok(cert.clone())
    }

    async fn delete_distribution_certificate(&self, account: &str, id: &str) -> RemoteResult<()> {
        self.calls.record("delete_distribution_certificate");
        let mut state = self.state.lock().unwrap();
        if let Some(users) = state.users.get_mut(account) {
            users.remove(id);
        }
        state
            .profiles
            .retain(|_, p| p.certificate_id.as_deref() != Some(id));
        for (_, record) in state.apps.values_mut() {
            record.clear_references_to(id);
        }
        Ok(())
    }

    async fn create_push_key(&self, account: &str, input: &PushKeyInput) -> RemoteResult<PushKey> {
        self.calls.record("create_push_key");
        let mut state = self.state.lock().unwrap();
        let key = PushKey {
            id: state.next_id("push"),
            key_identifier: input.key_identifier.clone(),
            key_p8: input.key_p8.clone(),
            apple_team: state.team_by_id(input.apple_team_id.as_ref()),
        };
        state
            .users
            .entry(account.to_string())
            .or_default()
            .insert(key.id.clone(), UserCredential::PushKey(key.clone()));
        Ok(key)
    }

    async fn delete_push_key(&self, account: &str, id: &str) -> RemoteResult<()> {
        self.calls.record("delete_push_key");
        let mut state = self.state.lock().unwrap();
        if let Some(users) = state.users.get_mut(account) {
            users.remove(id);
        }
        for (_, record) in state.apps.values_mut() {
            record.clear_references_to(id);
        }
        Ok(())
    }

    async fn create_provisioning_profile(
        &self,
        _app: &AppLookupParams,
        input: &ProvisioningProfileInput,
    ) -> RemoteResult<ProvisioningProfile> {
        self.calls.record("create_provisioning_profile");
        let mut state = self.state.lock().unwrap();
        let profile = ProvisioningProfile {
            id: state.next_id("profile"),
            provisioning_profile: input.provisioning_profile.clone(),
            developer_portal_identifier: input.developer_portal_identifier.clone(),
            status: Some(ProfileStatus::Active),
            expires_at: input.expires_at,
            apple_team: state.team_by_id(input.apple_team_id.as_ref()),
            certificate_id: input.certificate_id.clone(),
            device_udids: input.device_udids.clone(),
        };
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn update_provisioning_profile(
        &self,
        _app: &AppLookupParams,
        id: &str,
        input: &ProvisioningProfileInput,
    ) -> RemoteResult<ProvisioningProfile> {
        self.calls.record("update_provisioning_profile");
        let mut state = self.state.lock().unwrap();
        let team = state.team_by_id(input.apple_team_id.as_ref());
        let Some(profile) = state.profiles.get_mut(id) else {
            return Err(crate::remote::RemoteError::NotFound(id.to_string()));
        };
        profile.provisioning_profile = input.provisioning_profile.clone();
        profile.developer_portal_identifier = input.developer_portal_identifier.clone();
        profile.expires_at = input.expires_at;
        profile.apple_team = team;
        profile.certificate_id = input.certificate_id.clone();
        profile.device_udids = input.device_udids.clone();
        let updated = profile.clone();

        for (_, record) in state.apps.values_mut() {
            for build in record.build_credentials.values_mut() {
                if build.provisioning_profile.as_ref().is_some_and(|p| p.id == id) {
                    build.provisioning_profile = Some(updated.clone());
                }
            }
        }
        Ok(updated)
    }

    async fn delete_provisioning_profile(
        &self,
        _app: &AppLookupParams,
        id: &str,
    ) -> RemoteResult<()> {
        self.calls.record("delete_provisioning_profile");
        let mut state = self.state.lock().unwrap();
        state.profiles.remove(id);
        for (_, record) in state.apps.values_mut() {
            for build in record.build_credentials.values_mut() {
                if build.provisioning_profile.as_ref().is_some_and(|p| p.id == id) {
                    build.provisioning_profile = None;
                }
            }
        }
        Ok(())
    }

    async fn upsert_build_credentials(
        &self,
        app: &AppLookupParams,
        input: &BuildCredentialsInput,
    ) -> RemoteResult<BuildCredentials> {
        self.calls.record("upsert_build_credentials");
        let mut state = self.state.lock().unwrap();
        let profile = state.profiles.get(&input.provisioning_profile_id).cloned();
        let team = state.team_by_id(input.apple_team_id.as_ref());
        let new_id = state.next_id("bc");

        let record = state.app_entry(app);
        let id = record
            .build_credentials
            .get(&input.distribution_type)
            .map(|b| b.id.clone())
            .unwrap_or(new_id);
        let build = BuildCredentials {
            id,
            distribution_type: input.distribution_type,
            distribution_certificate_id: Some(input.distribution_certificate_id.clone()),
            provisioning_profile: profile,
            apple_team: team,
        };
        record
            .build_credentials
            .insert(input.distribution_type, build.clone());
        Ok(build)
    }

    async fn create_or_get_apple_team(
        &self,
        _account: &str,
        team: &AppleTeamInput,
    ) -> RemoteResult<AppleTeam> {
        self.calls.record("create_or_get_apple_team");
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.teams.get(&team.team_identifier) {
            return Ok(existing.clone());
        }
        let created = AppleTeam {
            id: state.next_id("team"),
            team_identifier: team.team_identifier.clone(),
            team_name: team.team_name.clone(),
        };
        state
            .teams
            .insert(team.team_identifier.clone(), created.clone());
        Ok(created)
    }

    async fn create_or_get_apple_app_identifier(
        &self,
        app: &AppLookupParams,
        _team: Option<&AppleTeam>,
    ) -> RemoteResult<AppleAppIdentifier> {
        self.calls.record("create_or_get_apple_app_identifier");
        Ok(AppleAppIdentifier {
            id: format!("appid-{}", app.bundle_identifier),
            bundle_identifier: app.bundle_identifier.clone(),
            parent_bundle_identifier: app.parent_bundle_identifier.clone(),
        })
    }

    async fn set_keystore(&self, app: &AppLookupParams, keystore: &Keystore) -> RemoteResult<()> {
        self.calls.record("set_keystore");
        let mut state = self.state.lock().unwrap();
        state.app_entry(app).keystore = Some(keystore.clone());
        Ok(())
    }

    async fn delete_keystore(&self, app: &AppLookupParams) -> RemoteResult<()> {
        self.calls.record("delete_keystore");
        let mut state = self.state.lock().unwrap();
        state.app_entry(app).keystore = None;
        Ok(())
    }

    fn supports_multi_target(&self) -> bool {
        self.multi_target
    }
}

/// Portal-generated ids start here so they never collide with seeded ones
const GENERATED_ID_BASE: u32 = 500;

#[derive(Debug, Default)]
struct PortalState {
    certificates: Vec<PortalCertificate>,
    profiles: Vec<PortalProfile>,
    devices: Vec<Device>,
    bundle_identifiers: HashSet<String>,
    certificate_limit: Option<usize>,
    next_id: u32,
}

const PORTAL_MUTATIONS: &[&str] = &[
    "create_distribution_certificate",
    "revoke_distribution_certificates",
    "create_provisioning_profile",
    "revoke_provisioning_profile",
    "register_device",
    "ensure_bundle_identifier",
];

/// Developer portal backed by lists, counting every call
#[derive(Debug, Default)]
pub struct FakePortal {
    state: Mutex<PortalState>,
    calls: CallLog,
    fail_auth: bool,
}

impl FakePortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A portal that rejects every login
    pub fn failing_auth() -> Self {
        Self {
            fail_auth: true,
            ..Self::default()
        }
    }

    pub fn session() -> PortalSession {
        PortalSession {
            team: AppleTeamInput {
                team_identifier: TEAM_ID.to_string(),
                team_name: Some("Acme Inc".to_string()),
            },
        }
    }

    pub fn add_certificate(&self, id: &str, serial: &str) {
        self.state.lock().unwrap().certificates.push(PortalCertificate {
            id: id.to_string(),
            serial_number: serial.to_string(),
            name: Some("iOS Distribution".to_string()),
            expires_at: Some(Utc::now() + Duration::days(300)),
        });
    }

    pub fn add_device(&self, udid: &str) -> Device {
        let device = device(udid);
        self.state.lock().unwrap().devices.push(device.clone());
        device
    }

    pub fn add_profile(&self, profile: PortalProfile) {
        self.state.lock().unwrap().profiles.push(profile);
    }

    pub fn set_certificate_limit(&self, limit: usize) {
        self.state.lock().unwrap().certificate_limit = Some(limit);
    }

    pub fn certificate_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .certificates
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn profile(&self, id: &str) -> Option<PortalProfile> {
        self.state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.get(name)
    }

    /// Number of mutating calls
    pub fn mutations(&self) -> usize {
        self.calls.sum(PORTAL_MUTATIONS)
    }
}

#[async_trait]
impl DeveloperPortal for FakePortal {
    async fn authenticate(&self, _interactive: bool) -> PortalResult<PortalSession> {
        self.calls.record("authenticate");
        if self.fail_auth {
            return Err(PortalError::NotAuthenticated("no credentials".to_string()));
        }
        Ok(Self::session())
    }

    async fn list_distribution_certificates(
        &self,
        _session: &PortalSession,
    ) -> PortalResult<Vec<PortalCertificate>> {
        self.calls.record("list_distribution_certificates");
        Ok(self.state.lock().unwrap().certificates.clone())
    }

    async fn create_distribution_certificate(
        &self,
        _session: &PortalSession,
    ) -> PortalResult<GeneratedCertificate> {
        self.calls.record("create_distribution_certificate");
        let mut state = self.state.lock().unwrap();
        if state
            .certificate_limit
            .is_some_and(|limit| state.certificates.len() >= limit)
        {
            return Err(PortalError::CertificateLimitReached);
        }
        state.next_id += 1;
        let id = format!("C{}", GENERATED_ID_BASE + state.next_id);
        let serial = format!("NEWSERIAL{}", state.next_id);
        let valid_until = Utc::now() + Duration::days(365);
        state.certificates.push(PortalCertificate {
            id: id.clone(),
            serial_number: serial.clone(),
            name: Some("iOS Distribution".to_string()),
            expires_at: Some(valid_until),
        });
        Ok(GeneratedCertificate {
            certificate_p12: p12_for_serial(&serial),
            certificate_password: "generated".to_string(),
            serial_number: serial,
            developer_portal_identifier: id,
            valid_until: Some(valid_until),
        })
    }

    async fn revoke_distribution_certificates(
        &self,
        _session: &PortalSession,
        ids: &[String],
    ) -> PortalResult<()> {
        self.calls.record("revoke_distribution_certificates");
        self.state
            .lock()
            .unwrap()
            .certificates
            .retain(|c| !ids.contains(&c.id));
        Ok(())
    }

    async fn list_provisioning_profiles(
        &self,
        _session: &PortalSession,
        bundle_identifier: &str,
        class: ProfileClass,
    ) -> PortalResult<Vec<PortalProfile>> {
        self.calls.record("list_provisioning_profiles");
        Ok(self
            .state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .filter(|p| p.bundle_identifier == bundle_identifier && p.class == class)
            .cloned()
            .collect())
    }

    async fn create_provisioning_profile(
        &self,
        _session: &PortalSession,
        request: &ProfileRequest,
    ) -> PortalResult<PortalProfile> {
        self.calls.record("create_provisioning_profile");
        let mut state = self.state.lock().unwrap();
        let serial = state
            .certificates
            .iter()
            .find(|c| c.id == request.certificate_portal_id)
            .map(|c| c.serial_number.clone())
            .ok_or_else(|| PortalError::Api {
                status: 404,
                message: format!("unknown certificate {}", request.certificate_portal_id),
            })?;
        let udids: Vec<String> = state
            .devices
            .iter()
            .filter(|d| request.device_ids.contains(&d.id))
            .map(|d| d.udid.clone())
            .collect();
        let udid_refs: Vec<&str> = udids.iter().map(String::as_str).collect();

        state.next_id += 1;
        let profile = PortalProfile {
            id: format!("P{}", GENERATED_ID_BASE + state.next_id),
            name: request.name.clone(),
            bundle_identifier: request.bundle_identifier.clone(),
            class: request.class,
            status: ProfileStatus::Active,
            expires_at: Some(Utc::now() + Duration::days(365)),
            certificate_serials: vec![serial],
            device_udids: udids.clone(),
            content: profile_content(&udid_refs),
        };
        state.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn revoke_provisioning_profile(
        &self,
        _session: &PortalSession,
        id: &str,
    ) -> PortalResult<()> {
        self.calls.record("revoke_provisioning_profile");
        self.state.lock().unwrap().profiles.retain(|p| p.id != id);
        Ok(())
    }

    async fn list_devices(&self, _session: &PortalSession) -> PortalResult<Vec<Device>> {
        self.calls.record("list_devices");
        Ok(self.state.lock().unwrap().devices.clone())
    }

    async fn register_device(
        &self,
        _session: &PortalSession,
        name: &str,
        udid: &str,
    ) -> PortalResult<Device> {
        self.calls.record("register_device");
        let registered = Device {
            id: format!("dev-{udid}"),
            udid: udid.to_string(),
            name: Some(name.to_string()),
        };
        self.state.lock().unwrap().devices.push(registered.clone());
        Ok(registered)
    }

    async fn ensure_bundle_identifier(
        &self,
        _session: &PortalSession,
        bundle_identifier: &str,
    ) -> PortalResult<()> {
        self.calls.record("ensure_bundle_identifier");
        self.state
            .lock()
            .unwrap()
            .bundle_identifiers
            .insert(bundle_identifier.to_string());
        Ok(())
    }
}

/// A queued answer for [`ScriptedPrompter`]
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    Password(String),
    Select(usize),
    MultiSelect(Vec<usize>),
    Confirm(bool),
}

#[derive(Debug, Default)]
struct Script {
    answers: VecDeque<Answer>,
    notes: Vec<String>,
    warnings: Vec<String>,
}

/// Prompter answering from a queue. Panics on any prompt it has no answer
/// for. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    script: Arc<Mutex<Script>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                answers: answers.into(),
                ..Script::default()
            })),
        }
    }

    fn next(&self, message: &str) -> Answer {
        self.script
            .lock()
            .unwrap()
            .answers
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {message}"))
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().answers.len()
    }

    pub fn notes(&self) -> Vec<String> {
        self.script.lock().unwrap().notes.clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.script.lock().unwrap().warnings.clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn text(&self, message: &str, _default: Option<&str>) -> PromptResult<String> {
        match self.next(message) {
            Answer::Text(value) => Ok(value),
            other => panic!("expected text answer for '{message}', got {other:?}"),
        }
    }

    async fn password(&self, message: &str) -> PromptResult<String> {
        match self.next(message) {
            Answer::Password(value) => Ok(value),
            other => panic!("expected password answer for '{message}', got {other:?}"),
        }
    }

    async fn select(
        &self,
        message: &str,
        items: &[String],
        _default: usize,
    ) -> PromptResult<usize> {
        match self.next(message) {
            Answer::Select(index) => {
                assert!(index < items.len(), "select index out of range for '{message}'");
                Ok(index)
            }
            other => panic!("expected select answer for '{message}', got {other:?}"),
        }
    }

    async fn multi_select(
        &self,
        message: &str,
        _items: &[String],
        _defaults: &[bool],
    ) -> PromptResult<Vec<usize>> {
        match self.next(message) {
            Answer::MultiSelect(indices) => Ok(indices),
            other => panic!("expected multi-select answer for '{message}', got {other:?}"),
        }
    }

    async fn confirm(&self, message: &str, _default: bool) -> PromptResult<bool> {
        match self.next(message) {
            Answer::Confirm(value) => Ok(value),
            other => panic!("expected confirm answer for '{message}', got {other:?}"),
        }
    }

    fn note(&self, message: &str) {
        self.script.lock().unwrap().notes.push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.script.lock().unwrap().warnings.push(message.to_string());
    }
}

/// Interactive context over the fakes
pub fn context(
    remote: &Arc<FakeRemoteStore>,
    portal: &Arc<FakePortal>,
    prompter: &ScriptedPrompter,
) -> Context {
    Context::new(
        Actor::new("tester"),
        std::env::temp_dir(),
        remote.clone(),
        portal.clone(),
        Box::new(prompter.clone()),
    )
}

/// Non-interactive context over the fakes
pub fn non_interactive_context(remote: &Arc<FakeRemoteStore>, portal: &Arc<FakePortal>) -> Context {
    Context::new(
        Actor::new("ci"),
        std::env::temp_dir(),
        remote.clone(),
        portal.clone(),
        Box::new(crate::prompt::NonInteractivePrompter),
    )
    .non_interactive(true)
}
