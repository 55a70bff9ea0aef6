//! Incuport - secure client toolkit for the incubation portal API
//!
//! Three pieces:
//! - [`crypto`]: the AES-256-CBC payload codec shared with the server
//! - [`http`]: an API client whose interceptors encrypt requests, attach
//!   session and routing headers, decrypt responses and expire sessions
//! - [`grid`]: a tabular data engine for listing, filtering, paginating
//!   and exporting records fetched from the API

pub mod app;
pub mod crypto;
pub mod error;
pub mod grid;
pub mod http;
pub mod session;

pub use app::Config;
pub use crypto::{Envelope, PayloadCodec};
pub use error::*;
pub use grid::{DataGrid, GridSpec};
pub use http::{ApiClient, SecureInterceptor};
pub use session::{Session, SessionStore};
