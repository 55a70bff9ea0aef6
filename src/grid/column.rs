//! Column configuration
//!
//! A column's [`ColumnKind`] selects exactly one rendering strategy.
//! Action columns are never sortable or filterable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::record::{field_text, GridRecord};

/// Width used when a column does not set one
pub const DEFAULT_WIDTH: u32 = 150;

/// Custom text renderer for a cell
pub type CellRenderer = Arc<dyn Fn(&GridRecord) -> String + Send + Sync>;

/// Predicate over a row (e.g. "is this action disabled?")
pub type RowPredicate = Arc<dyn Fn(&GridRecord) -> bool + Send + Sync>;

/// Chip colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipColor {
    pub background: String,
    pub text: String,
}

impl ChipColor {
    pub fn new(background: &str, text: &str) -> Self {
        Self {
            background: background.to_string(),
            text: text.to_string(),
        }
    }
}

impl Default for ChipColor {
    fn default() -> Self {
        Self::new("#f3f4f6", "#374151")
    }
}

/// Button shown in an actions column
#[derive(Clone)]
pub struct RowAction {
    pub label: String,
    pub variant: String,
    pub color: String,
    disabled: Option<RowPredicate>,
}

impl RowAction {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            variant: "contained".to_string(),
            color: "primary".to_string(),
            disabled: None,
        }
    }

    pub fn variant(mut self, variant: &str) -> Self {
        self.variant = variant.to_string();
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    pub fn disabled_when(mut self, predicate: impl Fn(&GridRecord) -> bool + Send + Sync + 'static) -> Self {
        self.disabled = Some(Arc::new(predicate));
        self
    }

    pub fn is_enabled(&self, record: &GridRecord) -> bool {
        !self.disabled.as_ref().is_some_and(|disabled| disabled(record))
    }
}

impl fmt::Debug for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowAction")
            .field("label", &self.label)
            .field("variant", &self.variant)
            .field("color", &self.color)
            .field("conditional", &self.disabled.is_some())
            .finish()
    }
}

/// Rendering strategy of a column
#[derive(Clone)]
pub enum ColumnKind {
    Text {
        renderer: Option<CellRenderer>,
    },
    Date,
    Chip {
        colors: HashMap<String, ChipColor>,
        /// Field whose value is shown as the chip label (defaults to the column field)
        display_field: Option<String>,
    },
    Actions {
        actions: Vec<RowAction>,
    },
}

impl ColumnKind {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Text { .. } => "text",
            ColumnKind::Date => "date",
            ColumnKind::Chip { .. } => "chip",
            ColumnKind::Actions { .. } => "actions",
        }
    }
}

impl fmt::Debug for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Text { renderer } => f
                .debug_struct("Text")
                .field("custom_renderer", &renderer.is_some())
                .finish(),
            ColumnKind::Date => f.write_str("Date"),
            ColumnKind::Chip { colors, display_field } => f
                .debug_struct("Chip")
                .field("colors", colors)
                .field("display_field", display_field)
                .finish(),
            ColumnKind::Actions { actions } => {
                f.debug_struct("Actions").field("actions", actions).finish()
            }
        }
    }
}

/// One grid column
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub field: String,
    pub header_name: String,
    pub width: u32,
    pub export_header: Option<String>,
    pub kind: ColumnKind,
    sortable: bool,
    filterable: bool,
}

impl ColumnSpec {
    fn with_kind(field: &str, header_name: &str, kind: ColumnKind) -> Self {
        Self {
            field: field.to_string(),
            header_name: header_name.to_string(),
            width: DEFAULT_WIDTH,
            export_header: None,
            kind,
            sortable: true,
            filterable: true,
        }
    }

    pub fn text(field: &str, header_name: &str) -> Self {
        Self::with_kind(field, header_name, ColumnKind::Text { renderer: None })
    }

    pub fn date(field: &str, header_name: &str) -> Self {
        Self::with_kind(field, header_name, ColumnKind::Date)
    }

    pub fn chip(field: &str, header_name: &str) -> Self {
        Self::with_kind(
            field,
            header_name,
            ColumnKind::Chip {
                colors: HashMap::new(),
                display_field: None,
            },
        )
    }

    pub fn actions(field: &str, header_name: &str, actions: Vec<RowAction>) -> Self {
        Self::with_kind(field, header_name, ColumnKind::Actions { actions })
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn export_header(mut self, header: &str) -> Self {
        self.export_header = Some(header.to_string());
        self
    }

    /// Custom renderer; only meaningful for text columns
    pub fn renderer(mut self, render: impl Fn(&GridRecord) -> String + Send + Sync + 'static) -> Self {
        if let ColumnKind::Text { renderer } = &mut self.kind {
            *renderer = Some(Arc::new(render));
        }
        self
    }

    /// Color for one chip value; only meaningful for chip columns
    pub fn chip_color(mut self, value: &str, color: ChipColor) -> Self {
        if let ColumnKind::Chip { colors, .. } = &mut self.kind {
            colors.insert(value.to_string(), color);
        }
        self
    }

    /// Show (and export) another field as the chip label
    pub fn display_field(mut self, field: &str) -> Self {
        if let ColumnKind::Chip { display_field, .. } = &mut self.kind {
            *display_field = Some(field.to_string());
        }
        self
    }

    pub fn is_actions(&self) -> bool {
        matches!(self.kind, ColumnKind::Actions { .. })
    }

    pub fn is_sortable(&self) -> bool {
        self.sortable && !self.is_actions()
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable && !self.is_actions()
    }

    /// Header used in export files
    pub fn export_header_name(&self) -> &str {
        self.export_header.as_deref().unwrap_or(&self.header_name)
    }
}

/// Column type names accepted in layout files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Date,
    Chip,
    Actions,
}

/// Declarative "field equals value" row condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub field: String,
    pub equals: String,
}

impl FieldMatch {
    pub fn matches(&self, record: &GridRecord) -> bool {
        field_text(record, &self.field).eq_ignore_ascii_case(&self.equals)
    }
}

/// Serializable action definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    pub label: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub disabled_when: Option<FieldMatch>,
}

/// Serializable column definition, as written in layout files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub field: String,
    pub header_name: String,
    #[serde(default, rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub sortable: Option<bool>,
    #[serde(default)]
    pub filterable: Option<bool>,
    #[serde(default)]
    pub export_header: Option<String>,
    #[serde(default)]
    pub chip_colors: HashMap<String, ChipColor>,
    #[serde(default)]
    pub display_field: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

impl From<ColumnDef> for ColumnSpec {
    fn from(def: ColumnDef) -> Self {
        let mut spec = match def.column_type {
            ColumnType::Text => ColumnSpec::text(&def.field, &def.header_name),
            ColumnType::Date => ColumnSpec::date(&def.field, &def.header_name),
            ColumnType::Chip => {
                let mut spec = ColumnSpec::chip(&def.field, &def.header_name);
                for (value, color) in def.chip_colors {
                    spec = spec.chip_color(&value, color);
                }
                match &def.display_field {
                    Some(field) => spec.display_field(field),
                    None => spec,
                }
            }
            ColumnType::Actions => {
                let actions = def.actions.into_iter().map(RowAction::from).collect();
                ColumnSpec::actions(&def.field, &def.header_name, actions)
            }
        };

        spec.width = def.width.unwrap_or(DEFAULT_WIDTH);
        spec.sortable = def.sortable.unwrap_or(true);
        spec.filterable = def.filterable.unwrap_or(true);
        spec.export_header = def.export_header;
        spec
    }
}

impl From<ActionDef> for RowAction {
    fn from(def: ActionDef) -> Self {
        let mut action = RowAction::new(&def.label);
        if let Some(variant) = &def.variant {
            action = action.variant(variant);
        }
        if let Some(color) = &def.color {
            action = action.color(color);
        }
        if let Some(condition) = def.disabled_when {
            action = action.disabled_when(move |record| condition.matches(record));
        }
        action
    }
}
