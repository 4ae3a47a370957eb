//! PKCS#12 export of portal-issued certificates with `openssl`

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, StoreError};

const PASSWORD_ENV: &str = "KEYSMITH_P12_PASSWORD";

/// Wrap a base64 DER certificate as PEM
pub(crate) fn der_base64_to_pem(der_base64: &str) -> String {
    let compact: String = der_base64.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for line in compact.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

pub(crate) fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

/// Bundle a certificate and its private key into a password-protected
/// PKCS#12 blob. Returns the base64 blob.
pub(crate) async fn export(
    certificate_der_base64: &str,
    key_path: &Path,
    password: &str,
) -> Result<String> {
    let dir = tempfile::tempdir()?;
    let cert_path = dir.path().join("certificate.pem");
    let p12_path = dir.path().join("certificate.p12");
    tokio::fs::write(&cert_path, der_base64_to_pem(certificate_der_base64)).await?;

    debug!(key = %key_path.display(), "exporting PKCS#12 with openssl");
    let output = Command::new("openssl")
        .args(["pkcs12", "-export", "-in"])
        .arg(&cert_path)
        .arg("-inkey")
        .arg(key_path)
        .arg("-out")
        .arg(&p12_path)
        .args(["-passout", &format!("env:{PASSWORD_ENV}")])
        .env(PASSWORD_ENV, password)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                StoreError::CommandFailed("openssl not found".to_string())
            }
            _ => StoreError::CommandFailed(format!("openssl failed: {}", e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StoreError::CommandFailed(format!(
            "openssl pkcs12 failed: {}",
            stderr.trim()
        )));
    }

    let bytes = tokio::fs::read(&p12_path).await?;
    Ok(BASE64.encode(bytes))
}
