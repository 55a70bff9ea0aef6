//! Application configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::crypto::{PayloadCodec, DEFAULT_KEY};
use crate::error::ConfigError;
use crate::http::{RouteTag, RouteTagTable};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API endpoint settings
    pub api: ApiConfig,

    /// Payload encryption settings
    pub crypto: CryptoConfig,

    /// Session persistence settings
    pub session: SessionConfig,

    /// Data grid defaults
    pub grid: GridConfig,

    /// Export settings
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL that relative request paths are joined onto
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Where to navigate when the session is invalidated
    pub app_root: String,

    /// Ordered module/action tagging rules (last match wins)
    pub route_tags: Vec<RouteTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Base64 AES-256 key shared with the server
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file (defaults to the data directory)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Rows per page when a grid is first shown
    pub default_page_size: usize,

    /// Page sizes offered to the user
    pub page_size_options: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory export files are written to (defaults to the current directory)
    pub output_dir: Option<PathBuf>,

    /// Base file name; the date and extension are appended
    pub filename: String,

    /// Worksheet name for spreadsheet exports
    pub sheet_name: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8089/itelinc/resources".to_string(),
            timeout_secs: 30,
            user_agent: format!("incuport/{}", env!("CARGO_PKG_VERSION")),
            app_root: "/".to_string(),
            route_tags: RouteTagTable::builtin(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            page_size_options: vec![5, 10, 25, 50],
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            filename: "data".to_string(),
            sheet_name: "Data".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_config_path() {
                Ok(p) => p,
                Err(_) => {
                    tracing::info!("No configuration directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::ReadError {
                    path: config_path.display().to_string(),
                    source,
                })?;

            let config = Self::from_toml(&contents)?;
            tracing::info!("Loaded configuration from {:?}", config_path);
            Ok(config)
        } else if path.is_some() {
            Err(ConfigError::ReadError {
                path: config_path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            })
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be greater than 0"));
        }

        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(invalid("api.base_url", "must be an absolute URL"));
        }

        if let Err(e) = PayloadCodec::new(&self.crypto.key) {
            return Err(invalid("crypto.key", &e.to_string()));
        }

        if self.grid.page_size_options.iter().any(|&size| size == 0) {
            return Err(invalid("grid.page_size_options", "page sizes must be greater than 0"));
        }

        if !self.grid.page_size_options.contains(&self.grid.default_page_size) {
            return Err(invalid(
                "grid.default_page_size",
                "must be one of grid.page_size_options",
            ));
        }

        if self.export.filename.trim().is_empty() {
            return Err(invalid("export.filename", "must not be empty"));
        }

        Ok(())
    }

    /// Session file path, falling back to the data directory
    pub fn session_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.session.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("session.json")),
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let dirs = Self::project_dirs().ok_or(ConfigError::NoDirectory("config"))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get data directory path
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        let dirs = Self::project_dirs().ok_or(ConfigError::NoDirectory("data"))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("io", "incuport", "incuport")
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.route_tags.len(), RouteTagTable::builtin().len());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
        assert_eq!(parsed.api.route_tags, config.api.route_tags);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [api]
            base_url = "https://portal.example.com/itelinc/resources"

            [[api.route_tags]]
            path = "/getusers"
            module = "Users"
            action = "Fetching users"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.route_tags.len(), 1);
        assert_eq!(config.grid.default_page_size, 10);
        assert_eq!(config.export.sheet_name, "Data");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.crypto.key = "c2hvcnQ=".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.grid.default_page_size = 7;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[export]\nfilename = \"companies\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.export.filename, "companies");
    }
}
