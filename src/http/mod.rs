//! HTTP client module
//!
//! Wraps the portal API behind an encrypting interceptor pipeline:
//! request bodies and query parameters travel as AES envelopes, session
//! credentials and module/action tags are attached to every call, and
//! authentication failures wipe the session.

mod client;
mod interceptor;
mod request;
mod response;
mod tagging;
mod transport;

pub use client::ApiClient;
pub use interceptor::{
    LogNavigator, Navigator, SecureInterceptor, SESSION_INVALIDATION_PHRASES, USER_ID_HEADER,
};
pub use request::{ApiRequest, ApiRequestBuilder};
pub use response::ApiResponse;
pub use tagging::{RouteTag, RouteTagTable, ACTION_HEADER, MODULE_HEADER};
pub use transport::{ReqwestTransport, Transport};
