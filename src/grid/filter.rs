//! Dropdown filters and their option lists

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{field_text, is_present, value_text, GridRecord};
use crate::error::DataShapeError;

/// Sentinel value meaning "do not filter on this field"
pub const ALL: &str = "all";

fn default_filter_width() -> u32 {
    200
}

/// One entry of a dropdown filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            count: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Label as shown in the menu, with the count when known
    pub fn display_label(&self) -> String {
        match self.count {
            Some(count) => format!("{} ({})", self.label, count),
            None => self.label.clone(),
        }
    }
}

/// Equality filter on one field, offered as a dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownFilterSpec {
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub options: Vec<FilterOption>,
    #[serde(default = "default_filter_width")]
    pub width: u32,
}

impl DropdownFilterSpec {
    pub fn new(field: &str, label: &str, options: Vec<FilterOption>) -> Self {
        Self {
            field: field.to_string(),
            label: label.to_string(),
            options,
            width: default_filter_width(),
        }
    }

    pub fn all_label(&self) -> String {
        format!("All {}", self.label)
    }

    /// Options as presented, led by the "all" entry
    pub fn menu(&self) -> Vec<FilterOption> {
        std::iter::once(FilterOption::new(ALL, self.all_label()))
            .chain(self.options.iter().cloned())
            .collect()
    }

    /// Whether `value` is the sentinel or one of the options (case-insensitive)
    pub fn accepts(&self, value: &str) -> bool {
        value == ALL || self.options.iter().any(|o| o.value.eq_ignore_ascii_case(value))
    }

    /// Whether a record passes this filter with the given selection
    pub fn matches(&self, record: &GridRecord, selected: &str) -> bool {
        if selected == ALL {
            return true;
        }

        let value = record.get(&self.field);
        if !is_present(value) {
            return false;
        }

        value
            .map(value_text)
            .is_some_and(|text| text.to_lowercase() == selected.to_lowercase())
    }
}

/// Distinct non-empty values of `field`, in first-seen order, with counts
pub fn options_from_records<'a, I>(records: I, field: &str) -> Vec<FilterOption>
where
    I: IntoIterator<Item = &'a GridRecord>,
{
    let mut options: Vec<FilterOption> = Vec::new();

    for record in records {
        let text = field_text(record, field);
        if text.is_empty() {
            continue;
        }
        match options.iter_mut().find(|o| o.value == text) {
            Some(option) => option.count = Some(option.count.unwrap_or(0) + 1),
            None => options.push(FilterOption::new(text.clone(), text).with_count(1)),
        }
    }

    options
}

/// Recover a list from a response body shaped as `[...]` or `{"data": [...]}`
pub fn extract_list(body: &Value) -> Result<Vec<Value>, DataShapeError> {
    match body {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(DataShapeError::UnexpectedShape(describe(body))),
        },
        other => Err(DataShapeError::UnexpectedShape(describe(other))),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "a boolean".into(),
        Value::Number(_) => "a number".into(),
        Value::String(_) => "a string".into(),
        Value::Array(_) => "a list".into(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("an object with keys [{}]", keys.join(", "))
        }
    }
}

/// Build dropdown options from a fetched list.
///
/// Entries without a usable value field are skipped; the label falls back
/// to the value.
pub fn options_from_list(items: &[Value], value_field: &str, label_field: &str) -> Vec<FilterOption> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let value = item.get(value_field).filter(|v| is_present(Some(v)));
            let Some(value) = value else {
                let e = DataShapeError::MissingField {
                    index,
                    field: value_field.to_string(),
                };
                tracing::warn!(error = %e, "Skipping option");
                return None;
            };

            let value = value_text(value);
            let label = item
                .get(label_field)
                .map(value_text)
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| value.clone());

            Some(FilterOption::new(value, label))
        })
        .collect()
}

/// Options straight from a response body; unexpected shapes yield none
pub fn options_from_response(body: &Value, value_field: &str, label_field: &str) -> Vec<FilterOption> {
    match extract_list(body) {
        Ok(items) => options_from_list(&items, value_field, label_field),
        Err(e) => {
            tracing::warn!(error = %e, "Unexpected option list, offering no options");
            Vec::new()
        }
    }
}
