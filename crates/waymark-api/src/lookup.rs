//! Device-existence lookup over the backend's HTTP API.
//!
//! One endpoint: `POST /api/check_device_existence` with
//! `{"device_id": ...}`, answered by `{"exists": bool}`. The dashboard
//! calls it before admitting a new accessory to the registry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

const EXISTENCE_PATH: &str = "api/check_device_existence";

#[derive(Debug, Serialize)]
struct ExistenceRequest<'a> {
    device_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExistenceResponse {
    exists: bool,
}

/// HTTP client for the device-lookup endpoint.
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LookupClient {
    /// Build a client against the backend base URL (scheme + host + port).
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// Check whether the backend has ever seen data for `device_id`.
    pub async fn device_exists(&self, device_id: &str) -> Result<bool, Error> {
        let url = self.base_url.join(EXISTENCE_PATH)?;

        let response = self
            .http
            .post(url)
            .json(&ExistenceRequest { device_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Lookup {
                message,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: ExistenceResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })?;

        Ok(parsed.exists)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> LookupClient {
        let base: Url = server.uri().parse().unwrap();
        LookupClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn existing_device_returns_true() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/check_device_existence"))
            .and(body_json(serde_json::json!({ "device_id": "pico-7" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "exists": true
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.device_exists("pico-7").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_device_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/check_device_existence"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "exists": false
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(!client.device_exists("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn server_error_is_lookup_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/check_device_existence"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({ "error": "Database error" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.device_exists("pico-7").await.unwrap_err();
        assert!(matches!(err, Error::Lookup { status: 500, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_deserialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/check_device_existence"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.device_exists("pico-7").await.unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }
}
