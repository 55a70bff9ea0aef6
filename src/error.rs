//! Custom error types for incuport
//!
//! Provides structured error handling with context propagation
//! and user-friendly error messages.

use thiserror::Error;

/// Main error type for incuport operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Payload encryption/decryption errors
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Session persistence errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Malformed API data
    #[error("Data error: {0}")]
    DataShape(#[from] DataShapeError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path}")]
    ReadError { path: String, source: std::io::Error },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {field} - {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Could not determine {0} directory")]
    NoDirectory(&'static str),
}

/// Symmetric payload codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Failed to encrypt data: {0}")]
    Encryption(String),

    #[error("Failed to decrypt data: {0}")]
    Decryption(String),
}

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    /// 401 with a session-invalidation message; the session has been wiped
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    /// Non-2xx response, body already decrypted when it carried an envelope
    #[error("Response error: {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        response: Box<crate::http::ApiResponse>,
    },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

/// Session persistence errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to read session file {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Failed to write session file {path}: {reason}")]
    Save { path: String, reason: String },
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Spreadsheet export is not available in this build")]
    LibraryUnavailable,

    #[error("Failed to encode {format}: {reason}")]
    Encode { format: String, reason: String },

    #[error("Failed to write export file {path}: {reason}")]
    Write { path: String, reason: String },
}

/// Malformed list responses (dropdown/category options)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataShapeError {
    #[error("Expected a list or an object with a `data` list, got {0}")]
    UnexpectedShape(String),

    #[error("List entry {index} has no usable `{field}` field")]
    MissingField { index: usize, field: String },
}

impl HttpError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::SessionExpired { .. } => Some(401),
            _ => None,
        }
    }

    /// The (possibly decrypted) error response
    pub fn response(&self) -> Option<&crate::http::ApiResponse> {
        match self {
            HttpError::Status { response, .. } => Some(response),
            _ => None,
        }
    }
}

impl PortalError {
    /// Create an error with additional context
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PortalError::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Config(e) => format!("Configuration problem: {}", e.user_hint()),
            PortalError::Crypto(e) => format!("Encryption problem: {}", e.user_hint()),
            PortalError::Http(e) => format!("Network issue: {}", e.user_hint()),
            PortalError::Session(e) => format!("Session issue: {}", e),
            PortalError::Export(e) => format!("Export issue: {}", e.user_hint()),
            PortalError::DataShape(e) => format!("Unexpected server data: {}", e),
            PortalError::Io(e) => format!("File system issue: {}", e),
            PortalError::WithContext { context, source } => {
                format!("{}: {}", context, source)
            }
        }
    }
}

/// Trait for providing user-friendly hints
pub trait UserHint {
    fn user_hint(&self) -> String;
}

impl UserHint for ConfigError {
    fn user_hint(&self) -> String {
        match self {
            ConfigError::ReadError { path, .. } => {
                format!("Could not read '{}'. Check if the file exists and you have read permissions.", path)
            }
            ConfigError::ParseError(_) => {
                "The configuration file has invalid syntax. Check for TOML formatting errors.".into()
            }
            ConfigError::ValidationError { field, reason } => {
                format!("Invalid value for '{}': {}", field, reason)
            }
            ConfigError::NoDirectory(kind) => {
                format!("No {} directory available. Pass an explicit path instead.", kind)
            }
        }
    }
}

impl UserHint for CryptoError {
    fn user_hint(&self) -> String {
        match self {
            CryptoError::InvalidKey(_) => {
                "The configured key must be base64 for exactly 32 bytes.".into()
            }
            CryptoError::Encryption(_) => {
                "The request could not be encrypted and was not sent.".into()
            }
            CryptoError::Decryption(_) => {
                "The payload is not a valid envelope for the configured key.".into()
            }
        }
    }
}

impl UserHint for HttpError {
    fn user_hint(&self) -> String {
        match self {
            HttpError::SessionExpired { .. } => {
                "Your session has expired. Please log in again.".into()
            }
            HttpError::ConnectionError(_) => {
                "Could not connect to the server. Check if it's running and accessible.".into()
            }
            HttpError::Timeout(ms) => {
                format!("Request timed out after {}ms. The server may be slow or unresponsive.", ms)
            }
            HttpError::InvalidUrl(url) => {
                format!("'{}' is not a valid URL. Check the format.", url)
            }
            _ => self.to_string(),
        }
    }
}

impl UserHint for ExportError {
    fn user_hint(&self) -> String {
        match self {
            ExportError::LibraryUnavailable => {
                "Excel export is not available. Use CSV instead.".into()
            }
            ExportError::Write { path, .. } => {
                format!("Could not write '{}'. Check the output directory.", path)
            }
            _ => self.to_string(),
        }
    }
}

/// Extension trait for adding context to Result types
pub trait ResultExt<T, E> {
    fn with_context<C>(self, context: C) -> Result<T, PortalError>
    where
        C: Into<String>;
}

impl<T, E> ResultExt<T, E> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<C>(self, context: C) -> Result<T, PortalError>
    where
        C: Into<String>,
    {
        self.map_err(|e| PortalError::with_context(context, e))
    }
}
