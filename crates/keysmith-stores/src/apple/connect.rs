//! App Store Connect API client

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use keysmith_core::AppleConfig;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};

const API_BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1";

/// JWT claims for App Store Connect API
#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    iat: i64,
    exp: i64,
    aud: String,
}

/// API key credentials
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub key_id: String,
    pub issuer_id: String,
    /// PEM contents of the `.p8` key
    pub private_key: String,
}

impl ApiKey {
    /// Read the key file named in the project configuration
    pub fn from_config(config: &AppleConfig, project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(&config.key_path);
        let private_key = std::fs::read_to_string(&path).map_err(|e| {
            StoreError::ConfigurationError(format!(
                "Failed to read API key {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self {
            key_id: config.key_id.clone(),
            issuer_id: config.issuer_id.clone(),
            private_key,
        })
    }
}

struct CachedToken {
    token: String,
    expires: DateTime<Utc>,
}

/// Authenticated JSON requests against App Store Connect
pub struct ConnectClient {
    key: ApiKey,
    client: Client,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl ConnectClient {
    pub fn new(key: ApiKey) -> Self {
        Self {
            key,
            client: Client::new(),
            base_url: API_BASE_URL.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Generate a JWT token, reusing the cached one while it is fresh
    pub(crate) fn jwt(&self) -> Result<String> {
        let mut cached = self
            .token
            .lock()
            .map_err(|_| StoreError::AuthenticationFailed("token cache poisoned".to_string()))?;
        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.expires - Duration::minutes(5) {
                return Ok(token.token.clone());
            }
        }

        let now = Utc::now();
        let exp = now + Duration::minutes(20);
        let claims = Claims {
            iss: self.key.issuer_id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            aud: "appstoreconnect-v1".to_string(),
        };

        let encoding_key = EncodingKey::from_ec_pem(self.key.private_key.as_bytes())
            .map_err(|e| StoreError::InvalidCredentials(format!("Invalid API key: {}", e)))?;
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key.key_id.clone());

        let token = encode(&header, &claims, &encoding_key)?;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires: exp,
        });
        Ok(token)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        let token = self.jwt()?;
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("API request: {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(classify_error(status, message))
    }

    /// Make an authenticated API request
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T> {
        Ok(self.send(method, endpoint, body).await?.json().await?)
    }

    /// Make an API request that returns no content
    pub(crate) async fn request_no_content(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<()> {
        self.send(method, endpoint, body).await?;
        Ok(())
    }
}

/// Map an error response to a store error
fn classify_error(status: StatusCode, message: String) -> StoreError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::AuthenticationFailed(message)
        }
        StatusCode::NOT_FOUND => StoreError::NotFound(message),
        StatusCode::CONFLICT
            if message.contains("maximum number") || message.contains("already have a current") =>
        {
            StoreError::CertificateLimit(message)
        }
        _ => StoreError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}
