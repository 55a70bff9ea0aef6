//! Wire transport
//!
//! The client speaks to the server through a [`Transport`] so the
//! interceptor pipeline can be exercised without a network.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::request::ApiRequest;
use super::response::ApiResponse;
use crate::app::Config;
use crate::error::HttpError;

/// Sends an already-intercepted request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver the request. Any server answer, including 4xx/5xx, is `Ok`;
    /// `Err` means no response was obtained.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, HttpError>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    /// Inner reqwest client
    client: reqwest::Client,

    /// Base URL for relative request paths
    base_url: String,

    /// Default timeout
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a new transport
    pub fn new(config: &Config) -> Result<Self, HttpError> {
        url::Url::parse(&config.api.base_url)
            .map_err(|_| HttpError::InvalidUrl(config.api.base_url.clone()))?;

        let default_timeout = Duration::from_secs(config.api.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .user_agent(&config.api.user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| HttpError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api.base_url.clone(),
            default_timeout,
        })
    }

    fn map_error(&self, error: reqwest::Error, timeout: Duration) -> HttpError {
        if error.is_timeout() {
            HttpError::Timeout(timeout.as_millis() as u64)
        } else if error.is_connect() {
            HttpError::ConnectionError(error.to_string())
        } else {
            HttpError::RequestFailed(error.to_string())
        }
    }

    /// Build response from reqwest response
    async fn build_response(
        &self,
        response: reqwest::Response,
        started: Instant,
    ) -> Result<ApiResponse, HttpError> {
        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        // Convert headers
        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_string(), v.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::RequestFailed(format!("Failed to read response body: {}", e)))?;

        Ok(ApiResponse {
            status,
            status_text,
            headers,
            body: body.to_vec(),
            duration_ms: started.elapsed().as_millis() as u64,
            decrypted: false,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, HttpError> {
        let started = Instant::now();

        let method = reqwest::Method::from_str(&request.method)
            .map_err(|_| HttpError::RequestFailed(format!("Invalid HTTP method: {}", request.method)))?;

        let full_url = request.full_url(&self.base_url);
        let url = url::Url::parse(&full_url).map_err(|_| HttpError::InvalidUrl(full_url.clone()))?;

        let mut builder = self.client.request(method, url);

        let mut headers = HeaderMap::new();
        for (key, value) in &request.headers {
            match (HeaderName::from_str(key), HeaderValue::from_str(value)) {
                (Ok(name), Ok(val)) => {
                    headers.insert(name, val);
                }
                _ => tracing::warn!(header = %key, "Dropping invalid header"),
            }
        }
        builder = builder.headers(headers);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let timeout = request
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);
        builder = builder.timeout(timeout);

        tracing::debug!(request_id = %request.id, method = %request.method, path = %request.path, "Sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_error(e, timeout))?;

        self.build_response(response, started).await
    }
}
