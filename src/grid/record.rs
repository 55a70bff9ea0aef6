//! Record access helpers

use serde_json::{Map, Value};
use std::path::Path;

use super::filter::extract_list;
use crate::error::{PortalError, ResultExt};

/// One row of caller-supplied data: field name to JSON value
pub type GridRecord = Map<String, Value>;

/// Text form of a value as used by search, filters and export.
///
/// `null` becomes the empty string; strings are taken verbatim.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Text of `field`, empty when the field is missing
pub fn field_text(record: &GridRecord, field: &str) -> String {
    record.get(field).map(value_text).unwrap_or_default()
}

/// Whether a field holds a usable value (not missing, null, `""` or `false`)
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Identity key for deduplication. `1` and `"1"` are distinct ids.
pub fn id_key(value: &Value) -> String {
    value.to_string()
}

/// Build a record from a JSON object; anything else yields `None`
pub fn from_value(value: Value) -> Option<GridRecord> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Load records from a JSON file holding a list or `{ "data": [...] }`.
/// Entries that are not objects are skipped.
pub fn read_records(path: &Path) -> Result<Vec<GridRecord>, PortalError> {
    let text = std::fs::read_to_string(path)
        .with_context(format!("Failed to read records from {}", path.display()))?;
    let body: Value = serde_json::from_str(&text)
        .with_context(format!("{} is not valid JSON", path.display()))?;
    let items = extract_list(&body)?;

    let total = items.len();
    let records: Vec<GridRecord> = items.into_iter().filter_map(from_value).collect();
    if records.len() < total {
        tracing::warn!(skipped = total - records.len(), "Skipped entries that are not objects");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!(null)), "");
        assert_eq!(value_text(&json!("Acme")), "Acme");
        assert_eq!(value_text(&json!(2)), "2");
        assert_eq!(value_text(&json!(2.5)), "2.5");
        assert_eq!(value_text(&json!(true)), "true");
    }

    #[test]
    fn test_presence() {
        let record = from_value(json!({"a": 0, "b": "", "c": null, "d": "x", "e": false})).unwrap();
        assert!(is_present(record.get("a")));
        assert!(!is_present(record.get("b")));
        assert!(!is_present(record.get("c")));
        assert!(is_present(record.get("d")));
        assert!(!is_present(record.get("e")));
        assert!(!is_present(record.get("missing")));
    }

    #[test]
    fn test_id_key_distinguishes_types() {
        assert_ne!(id_key(&json!(1)), id_key(&json!("1")));
        assert_eq!(id_key(&json!(1)), id_key(&json!(1)));
    }

    #[test]
    fn test_from_value() {
        assert!(from_value(json!({"id": 1})).is_some());
        assert!(from_value(json!([1])).is_none());
    }

    #[test]
    fn test_read_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, r#"{"data": [{"id": 1}, 5, {"id": 2}]}"#).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], 2);
    }

    #[test]
    fn test_read_records_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        assert!(matches!(read_records(&path), Err(PortalError::WithContext { .. })));

        std::fs::write(&path, r#"{"rows": []}"#).unwrap();
        assert!(matches!(read_records(&path), Err(PortalError::DataShape(_))));
    }
}
