//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::{DEFAULT_API_ENDPOINT, DEFAULT_CREDENTIALS_FILE};

/// Project configuration for keysmith
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Account that owns the project
    pub account: String,

    /// Project slug
    pub slug: String,

    /// Path of the local credentials file, relative to the project root
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// iOS configuration
    #[serde(default)]
    pub ios: Option<IosConfig>,

    /// Android configuration
    #[serde(default)]
    pub android: Option<AndroidConfig>,

    /// Remote credential store API
    #[serde(default)]
    pub api: ApiConfig,

    /// Apple developer portal (App Store Connect API key)
    #[serde(default)]
    pub apple: Option<AppleConfig>,
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIALS_FILE)
}

impl ProjectConfig {
    /// Full project name in the form `@account/slug`
    pub fn full_name(&self) -> String {
        format!("@{}/{}", self.account, self.slug)
    }

    /// Build targets declared for iOS.
    ///
    /// Without explicit targets the project has a single target named after
    /// the slug that uses the top-level bundle identifier.
    pub fn ios_targets(&self) -> Vec<IosTargetConfig> {
        let Some(ios) = &self.ios else {
            return Vec::new();
        };

        if ios.targets.is_empty() {
            vec![IosTargetConfig {
                name: self.slug.clone(),
                bundle_identifier: ios.bundle_identifier.clone(),
                parent_bundle_identifier: None,
            }]
        } else {
            ios.targets.clone()
        }
    }
}

/// iOS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IosConfig {
    /// Bundle identifier of the main application
    pub bundle_identifier: String,

    /// Build targets (application plus extensions)
    #[serde(default)]
    pub targets: Vec<IosTargetConfig>,
}

/// One iOS build target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosTargetConfig {
    /// Target name
    pub name: String,

    /// Bundle identifier of the target
    pub bundle_identifier: String,

    /// Bundle identifier of the containing app (app extensions only)
    #[serde(default)]
    pub parent_bundle_identifier: Option<String>,
}

/// Android configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidConfig {
    /// Application package name
    pub package: String,
}

/// Remote credential store API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint
    pub endpoint: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }
}

/// App Store Connect API key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppleConfig {
    /// API key ID
    pub key_id: String,

    /// Issuer ID
    pub issuer_id: String,

    /// Path to the `.p8` private key
    pub key_path: PathBuf,

    /// Apple Team identifier
    pub team_id: String,

    /// Apple Team display name
    #[serde(default)]
    pub team_name: Option<String>,

    /// Certificate signing request used when the portal issues a new
    /// distribution certificate
    #[serde(default)]
    pub csr_path: Option<PathBuf>,

    /// PEM private key the certificate signing request was made with
    #[serde(default)]
    pub csr_key_path: Option<PathBuf>,
}
