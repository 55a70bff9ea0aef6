//! Application configuration
//!
//! Settings shared by the API client, the session store and the data grid.

mod config;

pub use config::{ApiConfig, Config, CryptoConfig, ExportConfig, GridConfig, SessionConfig};
