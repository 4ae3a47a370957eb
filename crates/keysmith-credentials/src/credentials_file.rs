//! Local credentials file (`credentials.json`)
//!
//! ```json
//! {
//!   "android": {
//!     "keystore": {
//!       "keystorePath": "credentials/android/keystore.jks",
//!       "keystorePassword": "...",
//!       "keyAlias": "...",
//!       "keyPassword": "..."
//!     }
//!   },
//!   "ios": {
//!     "provisioningProfilePath": "credentials/ios/profile.mobileprovision",
//!     "distributionCertificate": { "path": "credentials/ios/dist-cert.p12", "password": "..." }
//!   }
//! }
//! ```
//!
//! For projects with several build targets, `ios` maps target names to the
//! object above. Paths are relative to the project root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CredentialsError, Result};
use crate::types::{BuildTarget, Keystore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidCredentials>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<IosCredentials>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidCredentials {
    pub keystore: KeystoreEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystoreEntry {
    pub keystore_path: String,
    pub keystore_password: String,
    pub key_alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_password: Option<String>,
}

/// iOS section: one set of credentials, or one per build target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IosCredentials {
    Single(IosTargetEntry),
    Multi(BTreeMap<String, IosTargetEntry>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosTargetEntry {
    pub provisioning_profile_path: String,
    pub distribution_certificate: CertificateEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEntry {
    pub path: String,
    pub password: String,
}

/// iOS signing material read from disk, base64-encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIosCredentials {
    pub provisioning_profile: String,
    pub certificate_p12: String,
    pub certificate_password: String,
}

impl LocalIosCredentials {
    pub fn profile_bytes(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(&self.provisioning_profile)?)
    }

    pub fn certificate_bytes(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(&self.certificate_p12)?)
    }
}

/// Resolve a path from the credentials file against the project root
pub fn resolve_path(project_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

fn invalid(path: &Path, message: impl Into<String>) -> CredentialsError {
    CredentialsError::InvalidCredentialsFile {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn require(path: &Path, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(path, format!("'{field}' must not be empty")));
    }
    Ok(())
}

impl IosTargetEntry {
    fn validate(&self, path: &Path, prefix: &str) -> Result<()> {
        require(
            path,
            &format!("{prefix}provisioningProfilePath"),
            &self.provisioning_profile_path,
        )?;
        require(
            path,
            &format!("{prefix}distributionCertificate.path"),
            &self.distribution_certificate.path,
        )
    }
}

impl CredentialsFile {
    /// Load and validate a credentials file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => invalid(path, "file does not exist"),
            _ => CredentialsError::Io(e),
        })?;
        let file: Self =
            serde_json::from_str(&content).map_err(|e| invalid(path, e.to_string()))?;
        file.validate(path)?;
        debug!(path = %path.display(), "loaded credentials file");
        Ok(file)
    }

    /// Load a credentials file, or start an empty one if there is none
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Schema checks beyond what deserialization enforces
    pub fn validate(&self, path: &Path) -> Result<()> {
        if let Some(android) = &self.android {
            let ks = &android.keystore;
            require(path, "android.keystore.keystorePath", &ks.keystore_path)?;
            require(path, "android.keystore.keystorePassword", &ks.keystore_password)?;
            require(path, "android.keystore.keyAlias", &ks.key_alias)?;
        }
        match &self.ios {
            Some(IosCredentials::Single(entry)) => entry.validate(path, "ios.")?,
            Some(IosCredentials::Multi(entries)) => {
                if entries.is_empty() {
                    return Err(invalid(path, "'ios' must not be an empty object"));
                }
                for (target, entry) in entries {
                    entry.validate(path, &format!("ios.{target}."))?;
                }
            }
            None => {}
        }
        Ok(())
    }

    /// The iOS entry of every build target. Fails when a target has no
    /// entry.
    pub fn ios_entries<'a>(
        &self,
        path: &Path,
        targets: &'a [BuildTarget],
    ) -> Result<Vec<(&'a BuildTarget, IosTargetEntry)>> {
        let ios = self
            .ios
            .as_ref()
            .ok_or_else(|| invalid(path, "no 'ios' credentials"))?;

        match ios {
            IosCredentials::Single(entry) => {
                if targets.len() > 1 {
                    return Err(invalid(
                        path,
                        format!(
                            "the project has {} build targets; 'ios' must map each target name to its credentials",
                            targets.len()
                        ),
                    ));
                }
                Ok(targets.iter().map(|t| (t, entry.clone())).collect())
            }
            IosCredentials::Multi(entries) => targets
                .iter()
                .map(|target| {
                    entries
                        .get(&target.target_name)
                        .map(|entry| (target, entry.clone()))
                        .ok_or_else(|| CredentialsError::MissingTarget {
                            path: path.to_path_buf(),
                            target: target.target_name.clone(),
                        })
                })
                .collect(),
        }
    }

    pub fn android_keystore(&self, path: &Path) -> Result<&KeystoreEntry> {
        self.android
            .as_ref()
            .map(|a| &a.keystore)
            .ok_or_else(|| invalid(path, "no 'android' credentials"))
    }
}

/// Read the certificate and profile an iOS entry points at
pub fn read_ios_entry(project_dir: &Path, entry: &IosTargetEntry) -> Result<LocalIosCredentials> {
    let profile = std::fs::read(resolve_path(project_dir, &entry.provisioning_profile_path))?;
    let certificate_path = resolve_path(project_dir, &entry.distribution_certificate.path);
    let certificate = std::fs::read(certificate_path)?;
    Ok(LocalIosCredentials {
        provisioning_profile: BASE64.encode(profile),
        certificate_p12: BASE64.encode(certificate),
        certificate_password: entry.distribution_certificate.password.clone(),
    })
}

/// Read the keystore an Android entry points at
pub fn read_keystore_entry(project_dir: &Path, entry: &KeystoreEntry) -> Result<Keystore> {
    let bytes = std::fs::read(resolve_path(project_dir, &entry.keystore_path))?;
    Ok(Keystore {
        keystore: BASE64.encode(bytes),
        keystore_password: entry.keystore_password.clone(),
        key_alias: entry.key_alias.clone(),
        key_password: entry.key_password.clone(),
    })
}
