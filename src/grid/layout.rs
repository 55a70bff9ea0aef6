//! Grid layout files
//!
//! A layout describes columns, dropdown filters and export settings in
//! TOML or JSON so a grid can be configured without code.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::column::{ColumnDef, ColumnSpec};
use super::filter::DropdownFilterSpec;
use super::GridSpec;
use crate::error::ConfigError;

fn default_id_field() -> String {
    "id".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_id_field")]
    pub unique_id_field: String,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub search_placeholder: Option<String>,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub dropdown_filters: Vec<DropdownFilterSpec>,
    #[serde(default = "default_true")]
    pub enable_export: bool,
    #[serde(default = "default_true")]
    pub enable_column_filters: bool,
    #[serde(default)]
    pub export_filename: Option<String>,
}

impl GridLayout {
    /// Read a layout; `.json` files are parsed as JSON, anything else as TOML
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let layout: Self = if is_json {
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?
        } else {
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?
        };

        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "columns".into(),
                reason: "at least one column is required".into(),
            });
        }
        if self.unique_id_field.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "unique_id_field".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn into_spec(self) -> GridSpec {
        let columns = self.columns.into_iter().map(ColumnSpec::from).collect();
        let mut spec = GridSpec::new(columns)
            .unique_id_field(&self.unique_id_field)
            .search_fields(self.search_fields)
            .dropdown_filters(self.dropdown_filters);

        spec.title = self.title;
        spec.enable_export = self.enable_export;
        spec.enable_column_filters = self.enable_column_filters;
        if let Some(placeholder) = self.search_placeholder {
            spec.search_placeholder = placeholder;
        }
        if let Some(filename) = self.export_filename {
            spec.export_filename = filename;
        }
        spec
    }
}
