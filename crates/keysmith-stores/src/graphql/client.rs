//! Minimal GraphQL-over-HTTP client

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};

#[derive(Debug, Deserialize)]
struct Response<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    message: String,
    #[serde(default)]
    extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct ErrorExtensions {
    code: Option<String>,
}

/// Sends GraphQL documents to one endpoint with a bearer token
pub struct GraphqlClient {
    endpoint: String,
    token: Option<String>,
    client: Client,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run a query or mutation and deserialize its `data`
    pub async fn request<T: DeserializeOwned>(
        &self,
        operation: &str,
        document: &str,
        variables: Value,
    ) -> Result<T> {
        let token = self.token.as_deref().ok_or_else(|| {
            StoreError::AuthenticationFailed(
                "no access token; set KEYSMITH_TOKEN or log in".to_string(),
            )
        })?;

        debug!(operation, endpoint = %self.endpoint, "GraphQL request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "operationName": operation,
                "query": document,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::AuthenticationFailed(format!(
                "the credential store rejected the access token ({status})"
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: Response<T> = response.json().await?;
        into_data(body)
    }
}

fn into_data<T>(body: Response<T>) -> Result<T> {
    if let Some(first) = body.errors.first() {
        let message = body
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(StoreError::Graphql {
            code: first.extensions.as_ref().and_then(|e| e.code.clone()),
            message,
        });
    }
    body.data
        .ok_or_else(|| StoreError::Graphql {
            code: None,
            message: "response has neither data nor errors".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Data {
        value: u32,
    }

    #[test]
    fn test_errors_take_precedence_over_data() {
        let body: Response<Data> = serde_json::from_str(
            r#"{
                "data": {"value": 1},
                "errors": [
                    {"message": "not allowed", "extensions": {"code": "UNAUTHENTICATED"}},
                    {"message": "second"}
                ]
            }"#,
        )
        .unwrap();

        match into_data(body).unwrap_err() {
            StoreError::Graphql { code, message } => {
                assert_eq!(code.as_deref(), Some("UNAUTHENTICATED"));
                assert_eq!(message, "not allowed; second");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_data_is_returned() {
        let body: Response<Data> = serde_json::from_str(r#"{"data": {"value": 7}}"#).unwrap();
        assert_eq!(into_data(body).unwrap().value, 7);
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_sending() {
        let client = GraphqlClient::new("http://127.0.0.1:9/graphql", None);
        let err = client
            .request::<Data>("Test", "query Test { value }", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AuthenticationFailed(_)));
    }
}
