//! Android upload keystore generation with `keytool`

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{CredentialsError, Result};
use crate::types::Keystore;

const PASSWORD_LENGTH: usize = 32;

fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Arguments for `keytool -genkeypair`
fn keytool_args(
    keystore_path: &Path,
    alias: &str,
    store_password: &str,
    key_password: &str,
    package: &str,
) -> Vec<String> {
    vec![
        "-genkeypair".to_string(),
        "-v".to_string(),
        "-storetype".to_string(),
        "JKS".to_string(),
        "-keyalg".to_string(),
        "RSA".to_string(),
        "-keysize".to_string(),
        "2048".to_string(),
        "-validity".to_string(),
        "10000".to_string(),
        "-storepass".to_string(),
        store_password.to_string(),
        "-keypass".to_string(),
        key_password.to_string(),
        "-alias".to_string(),
        alias.to_string(),
        "-keystore".to_string(),
        keystore_path.display().to_string(),
        "-dname".to_string(),
        format!("CN={package},OU=,O=,L=,S=,C=US"),
    ]
}

/// Generate a new keystore with random passwords and alias
#[instrument(skip_all, fields(package = %package))]
pub async fn generate_keystore(package: &str) -> Result<Keystore> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("keystore.jks");
    let alias = uuid::Uuid::new_v4().simple().to_string();
    let store_password = random_password();
    let key_password = random_password();

    debug!(path = %path.display(), "running keytool");
    let output = Command::new("keytool")
        .args(keytool_args(&path, &alias, &store_password, &key_password, package))
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CredentialsError::Keytool(
                "keytool not found. Install a JDK to generate Android keystores".to_string(),
            ),
            _ => CredentialsError::Keytool(e.to_string()),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CredentialsError::Keytool(stderr.trim().to_string()));
    }

    let bytes = tokio::fs::read(&path).await?;
    Ok(Keystore {
        keystore: BASE64.encode(bytes),
        keystore_password: store_password,
        key_alias: alias,
        key_password: Some(key_password),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keytool_args() {
        let args = keytool_args(
            Path::new("/tmp/ks.jks"),
            "alias",
            "store",
            "key",
            "com.acme.rocket",
        );
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-alias") + 1], "alias");
        assert_eq!(args[pos("-storepass") + 1], "store");
        assert_eq!(args[pos("-keypass") + 1], "key");
        assert_eq!(args[pos("-keystore") + 1], "/tmp/ks.jks");
        assert!(args.last().unwrap().starts_with("CN=com.acme.rocket"));
    }

    #[test]
    fn test_random_password() {
        let a = random_password();
        assert_eq!(a.len(), PASSWORD_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_password());
    }
}
