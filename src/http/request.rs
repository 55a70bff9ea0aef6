//! API request types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Outgoing API call, before and after interception
///
/// The request interceptor rewrites `body`, `params` and `headers` in place;
/// what the transport sees is the post-interception form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Unique request ID (for log correlation)
    pub id: String,

    /// HTTP method
    pub method: String,

    /// Path relative to the API base URL, or an absolute URL
    pub path: String,

    /// Request headers
    pub headers: HashMap<String, String>,

    /// Query parameters
    pub params: Map<String, Value>,

    /// JSON body
    pub body: Option<Value>,

    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: "GET".to_string(),
            path: String::new(),
            headers: HashMap::new(),
            params: Map::new(),
            body: None,
            timeout: None,
        }
    }
}

impl ApiRequest {
    /// Create a new request
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Create a builder for constructing requests
    pub fn builder() -> ApiRequestBuilder {
        ApiRequestBuilder::default()
    }

    /// Whether the call carries anything the interceptor must encrypt
    pub fn has_payload(&self) -> bool {
        matches!(&self.body, Some(body) if !body.is_null()) || !self.params.is_empty()
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Resolve the request against `base_url` and append any query parameters
    pub fn full_url(&self, base_url: &str) -> String {
        let url = if self.path.starts_with("http://") || self.path.starts_with("https://") {
            self.path.clone()
        } else if self.path.is_empty() {
            base_url.to_string()
        } else {
            format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                self.path.trim_start_matches('/')
            )
        };

        if self.params.is_empty() {
            return url;
        }

        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{}={}", urlencoding::encode(k), urlencoding::encode(&value))
            })
            .collect();

        if url.contains('?') {
            format!("{}&{}", url, params.join("&"))
        } else {
            format!("{}?{}", url, params.join("&"))
        }
    }
}

/// Builder for constructing requests
#[derive(Debug, Default)]
pub struct ApiRequestBuilder {
    request: ApiRequest,
}

impl ApiRequestBuilder {
    /// Set the request method
    pub fn method(mut self, method: &str) -> Self {
        self.request.method = method.to_uppercase();
        self
    }

    /// Set the request path
    pub fn path(mut self, path: &str) -> Self {
        self.request.path = path.to_string();
        self
    }

    /// Add a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Add a query parameter
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.request.params.insert(key.to_string(), value.into());
        self
    }

    /// Set the JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.request.body = Some(body);
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.request.timeout = Some(seconds);
        self
    }

    /// Build the request
    pub fn build(self) -> ApiRequest {
        self.request
    }
}
