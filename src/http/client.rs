//! API client: interceptors wrapped around a transport

use serde_json::{Map, Value};
use std::sync::Arc;

use super::interceptor::{Navigator, SecureInterceptor};
use super::request::ApiRequest;
use super::response::ApiResponse;
use super::tagging::RouteTagTable;
use super::transport::{ReqwestTransport, Transport};
use crate::app::Config;
use crate::crypto::PayloadCodec;
use crate::error::PortalError;
use crate::grid::{self, FilterOption};
use crate::session::SessionStore;

/// Client for the portal API
///
/// Every call goes through [`SecureInterceptor::on_request`] before it
/// reaches the transport and through [`SecureInterceptor::on_response`]
/// after the server answers.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    interceptor: SecureInterceptor,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &Config, session: SessionStore) -> Result<Self, PortalError> {
        let codec = PayloadCodec::new(&config.crypto.key)?;
        let transport = ReqwestTransport::new(config)?;
        let interceptor = SecureInterceptor::new(
            codec,
            session,
            RouteTagTable::new(config.api.route_tags.clone()),
        )
        .with_app_root(&config.api.app_root);

        Ok(Self::with_transport(interceptor, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(interceptor: SecureInterceptor, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            interceptor,
        }
    }

    /// Replace the session-expiry navigator
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.interceptor = self.interceptor.with_navigator(navigator);
        self
    }

    pub fn session(&self) -> &SessionStore {
        self.interceptor.session()
    }

    /// Execute a request through the interceptor pipeline
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, PortalError> {
        let request = self.interceptor.on_request(request)?;
        let response = self.transport.send(&request).await.map_err(|e| {
            tracing::warn!(request_id = %request.id, error = %e, "Request failed without a response");
            e
        })?;
        Ok(self.interceptor.on_response(response)?)
    }

    /// GET with optional query parameters
    pub async fn get(&self, path: &str, params: Map<String, Value>) -> Result<ApiResponse, PortalError> {
        let mut request = ApiRequest::new("GET", path);
        request.params = params;
        self.execute(request).await
    }

    /// POST a JSON body
    pub async fn post(&self, path: &str, body: Value) -> Result<ApiResponse, PortalError> {
        self.execute(ApiRequest::builder().method("POST").path(path).json(body).build())
            .await
    }

    /// PUT a JSON body
    pub async fn put(&self, path: &str, body: Value) -> Result<ApiResponse, PortalError> {
        self.execute(ApiRequest::builder().method("PUT").path(path).json(body).build())
            .await
    }

    /// DELETE with optional query parameters
    pub async fn delete(&self, path: &str, params: Map<String, Value>) -> Result<ApiResponse, PortalError> {
        let mut request = ApiRequest::new("DELETE", path);
        request.params = params;
        self.execute(request).await
    }

    /// Fetch a list endpoint. Bodies that are not a list (or `{ "data": [...] }`)
    /// are logged and treated as empty.
    pub async fn fetch_list(&self, path: &str, params: Map<String, Value>) -> Result<Vec<Value>, PortalError> {
        let response = self.get(path, params).await?;
        let body = response.json_value().unwrap_or(Value::Null);

        Ok(grid::extract_list(&body).unwrap_or_else(|e| {
            tracing::warn!(path, error = %e, "Unexpected list response, using an empty list");
            Vec::new()
        }))
    }

    /// Fetch dropdown options from a list endpoint
    pub async fn fetch_options(
        &self,
        path: &str,
        params: Map<String, Value>,
        value_field: &str,
        label_field: &str,
    ) -> Result<Vec<FilterOption>, PortalError> {
        let items = self.fetch_list(path, params).await?;
        Ok(grid::options_from_list(&items, value_field, label_field))
    }
}
