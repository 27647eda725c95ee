//! REST client for the SONiC management interface.
//!
//! This module provides the HTTP client used to read facts and to apply
//! translated requests, with basic authentication and retries for transient
//! failures.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result, SonicError};

use super::translate::{HttpMethod, RestRequest};

/// Default delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Sends translated requests to a device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestSender: Send + Sync {
    /// Sends one request, returning the response body if there is one.
    async fn send(&self, request: &RestRequest) -> Result<Option<Value>>;
}

/// Device REST client.
#[derive(Debug, Clone)]
pub struct RestClient {
    /// HTTP client.
    client: Client,
    /// Base URL, without trailing slash.
    base_url: String,
    /// Basic auth user.
    username: String,
    /// Basic auth password.
    password: Option<String>,
    /// Attempts per request.
    max_retries: u32,
    /// Base delay between attempts.
    retry_delay: Duration,
}

impl RestClient {
    /// Creates a client for the configured device.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &DeviceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| DeviceError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Sets the base delay between retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reads the tree at `path`. A missing node reads as `Null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn get(&self, path: &str) -> Result<Value> {
        let request = RestRequest::get(path);
        Ok(self.execute(&request).await?.unwrap_or(Value::Null))
    }

    /// Executes a request with retries.
    async fn execute(&self, request: &RestRequest) -> Result<Option<Value>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {}", self.max_retries);
                tokio::time::sleep(self.retry_delay * attempt).await;
            }

            match self.execute_once(request).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SonicError::Device(DeviceError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    /// Executes a single request.
    async fn execute_once(&self, request: &RestRequest) -> Result<Option<Value>> {
        trace!("{} {}", request.method, request.path);

        let response = self
            .builder(request)
            .send()
            .await
            .map_err(|e| DeviceError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 1 } else { retry_after };

            return Err(DeviceError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DeviceError::AuthenticationFailed {
                message: format!("{} rejected credentials for '{}'", self.base_url, self.username),
            }
            .into());
        }

        // Reading or deleting a node that is not configured is not an error.
        if status == StatusCode::NOT_FOUND
            && matches!(request.method, HttpMethod::Get | HttpMethod::Delete)
        {
            debug!("{} not present on device", request.path);
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeviceError::request_failed(status.as_u16(), body).into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| DeviceError::InvalidResponse {
                message: format!("Failed to read response: {e}"),
            })?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body).map(Some).map_err(|e| {
            DeviceError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            }
            .into()
        })
    }

    fn builder(&self, request: &RestRequest) -> RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };
        let url = format!("{}{}", self.base_url, request.path);

        let builder = self
            .client
            .request(method, url)
            .basic_auth(&self.username, self.password.as_ref())
            .header(header::ACCEPT, "application/yang-data+json");

        match &request.body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/yang-data+json")
                .body(body.to_string()),
            None => builder,
        }
    }
}

#[async_trait]
impl RequestSender for RestClient {
    async fn send(&self, request: &RestRequest) -> Result<Option<Value>> {
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> RestClient {
        let mut config = DeviceConfig::for_host(server.uri());
        config.password = Some(String::from("secret"));
        RestClient::new(&config)
            .expect("client")
            .with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_get_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/restconf/data/sonic-vlan:sonic-vlan"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "VLAN": {} })))
            .mount(&server)
            .await;

        let value = client(&server)
            .await
            .get("/restconf/data/sonic-vlan:sonic-vlan")
            .await
            .expect("get");
        assert_eq!(value, json!({ "VLAN": {} }));
    }

    #[tokio::test]
    async fn test_get_missing_reads_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let value = client(&server).await.get("/restconf/data/x").await.expect("get");
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_patch_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/restconf/data/x"))
            .and(body_json(json!({ "mtu": 9216 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request = RestRequest::new(HttpMethod::Patch, "/restconf/data/x", Some(json!({ "mtu": 9216 })));
        let result = client(&server).await.send(&request).await.expect("patch");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let request = RestRequest::new(HttpMethod::Delete, "/restconf/data/x", None);
        let err = client(&server).await.send(&request).await.expect_err("fails");
        assert!(matches!(
            err,
            SonicError::Device(DeviceError::RequestFailed { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).await.get("/restconf/data/x").await.expect_err("fails");
        assert!(matches!(
            err,
            SonicError::Device(DeviceError::AuthenticationFailed { .. })
        ));
    }
}
