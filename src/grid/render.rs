//! Cell rendering by column type

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use super::column::{ChipColor, ColumnKind, ColumnSpec};
use super::record::{field_text, value_text, GridRecord};

/// Shown for empty or unparseable text and date cells
pub const EMPTY_CELL: &str = "-";

/// Label of a chip without a value
pub const EMPTY_CHIP: &str = "—";

/// Output format of date cells
pub const DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionButton {
    pub label: String,
    pub variant: String,
    pub color: String,
    pub enabled: bool,
}

/// A rendered cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CellValue {
    Text { value: String },
    Chip { label: String, color: ChipColor },
    Actions { buttons: Vec<ActionButton> },
}

impl CellValue {
    fn text(value: impl Into<String>) -> Self {
        CellValue::Text { value: value.into() }
    }

    /// Plain-text form for terminal output
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Text { value } => value.clone(),
            CellValue::Chip { label, .. } => label.clone(),
            CellValue::Actions { buttons } => buttons
                .iter()
                .map(|b| {
                    if b.enabled {
                        format!("[{}]", b.label)
                    } else {
                        format!("({})", b.label)
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

pub fn render_cell(column: &ColumnSpec, record: &GridRecord) -> CellValue {
    match &column.kind {
        ColumnKind::Text { renderer: Some(render) } => CellValue::text(render(record)),
        ColumnKind::Text { renderer: None } => {
            let text = field_text(record, &column.field);
            CellValue::text(if text.is_empty() { EMPTY_CELL.to_string() } else { text })
        }
        ColumnKind::Date => CellValue::text(format_date(record.get(&column.field))),
        ColumnKind::Chip { colors, display_field } => {
            let value = field_text(record, &column.field);
            let label = chip_label(record, &column.field, display_field.as_deref());
            CellValue::Chip {
                label: if label.is_empty() { EMPTY_CHIP.to_string() } else { label },
                color: colors.get(&value).cloned().unwrap_or_default(),
            }
        }
        ColumnKind::Actions { actions } => CellValue::Actions {
            buttons: actions
                .iter()
                .map(|a| ActionButton {
                    label: a.label.clone(),
                    variant: a.variant.clone(),
                    color: a.color.clone(),
                    enabled: a.is_enabled(record),
                })
                .collect(),
        },
    }
}

/// Text shown on a chip: the display field when set, else the column value
pub fn chip_label(record: &GridRecord, field: &str, display_field: Option<&str>) -> String {
    field_text(record, display_field.unwrap_or(field))
}

/// Format a date-like value as `MM/DD/YYYY`, or `-` when it cannot be read.
///
/// Accepts ISO 8601 strings (with or without time and offset), compact
/// `YYYYMMDDHHMMSS` stamps, `[y, m, d, h, mi, s]` arrays, epoch
/// milliseconds and a few human-readable forms.
pub fn format_date(value: Option<&Value>) -> String {
    parse_date(value)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| EMPTY_CELL.to_string())
}

pub fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value? {
        Value::String(s) => parse_date_str(s),
        Value::Array(parts) => parse_date_parts(parts),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

fn parse_date_parts(parts: &[Value]) -> Option<NaiveDate> {
    if parts.len() < 3 {
        return None;
    }
    let year = i32::try_from(parts[0].as_i64()?).ok()?;
    let month = u32::try_from(parts[1].as_i64()?).ok()?;
    let day = u32::try_from(parts[2].as_i64()?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim().replace('?', " ");
    if text.is_empty() {
        return None;
    }

    if text.len() == 14 && text.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDateTime::parse_from_str(&text, "%Y%m%d%H%M%S")
            .ok()
            .map(|dt| dt.date());
    }

    // Date-only values sometimes arrive with a bare `Z` suffix
    if let Some(date_part) = text.strip_suffix('Z') {
        if !date_part.contains('T') {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.date_naive());
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%b %d, %Y, %I:%M:%S %p",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&text, format) {
            return Some(dt.date());
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%d %b %Y"];
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&text, format).ok())
}

/// Value written to export files for one column
pub fn export_value(column: &ColumnSpec, record: &GridRecord) -> String {
    match &column.kind {
        ColumnKind::Date => format_date(record.get(&column.field)),
        ColumnKind::Chip { display_field, .. } => {
            chip_label(record, &column.field, display_field.as_deref())
        }
        _ => record.get(&column.field).map(value_text).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::column::RowAction;
    use crate::grid::record::from_value;
    use serde_json::json;

    fn record(value: Value) -> GridRecord {
        from_value(value).unwrap()
    }

    fn date(value: Value) -> String {
        format_date(Some(&value))
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(date(json!("2024-03-05")), "03/05/2024");
        assert_eq!(date(json!("2024-03-05Z")), "03/05/2024");
        assert_eq!(date(json!("2024-03-05T10:15:00Z")), "03/05/2024");
        assert_eq!(date(json!("2024-03-05T10:15:00.123")), "03/05/2024");
        assert_eq!(date(json!("2024-03-05 10:15:00")), "03/05/2024");
        assert_eq!(date(json!("2024-03-05?10:15:00")), "03/05/2024");
        assert_eq!(date(json!("20240305101500")), "03/05/2024");
        assert_eq!(date(json!([2024, 3, 5, 10, 15, 0])), "03/05/2024");
        assert_eq!(date(json!("Sep 19, 2025, 12:46:43 PM")), "09/19/2025");
        assert_eq!(date(json!(1709633700000_i64)), "03/05/2024");
    }

    #[test]
    fn test_unreadable_dates() {
        assert_eq!(format_date(None), EMPTY_CELL);
        assert_eq!(date(json!(null)), EMPTY_CELL);
        assert_eq!(date(json!("")), EMPTY_CELL);
        assert_eq!(date(json!("not a date")), EMPTY_CELL);
        assert_eq!(date(json!([2024, 13, 1])), EMPTY_CELL);
        assert_eq!(date(json!(true)), EMPTY_CELL);
    }

    #[test]
    fn test_text_cells() {
        let col = ColumnSpec::text("name", "Name");
        assert_eq!(render_cell(&col, &record(json!({"name": "Acme"}))).display_text(), "Acme");
        assert_eq!(render_cell(&col, &record(json!({}))).display_text(), EMPTY_CELL);

        let custom = ColumnSpec::text("name", "Name")
            .renderer(|r| field_text(r, "name").to_uppercase());
        assert_eq!(render_cell(&custom, &record(json!({"name": "acme"}))).display_text(), "ACME");
    }

    #[test]
    fn test_chip_cells() {
        let col = ColumnSpec::chip("status", "Status")
            .chip_color("approved", ChipColor::new("#dcfce7", "#166534"));

        match render_cell(&col, &record(json!({"status": "approved"}))) {
            CellValue::Chip { label, color } => {
                assert_eq!(label, "approved");
                assert_eq!(color.background, "#dcfce7");
            }
            other => panic!("unexpected cell {:?}", other),
        }

        match render_cell(&col, &record(json!({"status": ""}))) {
            CellValue::Chip { label, color } => {
                assert_eq!(label, EMPTY_CHIP);
                assert_eq!(color, ChipColor::default());
            }
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_chip_display_field() {
        let col = ColumnSpec::chip("stage", "Stage")
            .display_field("stagename")
            .chip_color("2", ChipColor::new("#fef3c7", "#92400e"));
        let row = record(json!({"stage": 2, "stagename": "Growth"}));

        match render_cell(&col, &row) {
            CellValue::Chip { label, color } => {
                assert_eq!(label, "Growth");
                assert_eq!(color.text, "#92400e");
            }
            other => panic!("unexpected cell {:?}", other),
        }
        assert_eq!(export_value(&col, &row), "Growth");
    }

    #[test]
    fn test_action_cells() {
        let col = ColumnSpec::actions(
            "actions",
            "Actions",
            vec![
                RowAction::new("Edit"),
                RowAction::new("Delete").disabled_when(|r| field_text(r, "locked") == "true"),
            ],
        );
        let cell = render_cell(&col, &record(json!({"locked": true})));
        assert_eq!(cell.display_text(), "[Edit] (Delete)");
    }

    #[test]
    fn test_cell_serialization() {
        let cell = CellValue::Text { value: "x".into() };
        assert_eq!(serde_json::to_value(&cell).unwrap(), json!({"type": "text", "value": "x"}));
    }

    #[test]
    fn test_export_values() {
        let row = record(json!({"name": null, "created": "2024-03-05"}));
        assert_eq!(export_value(&ColumnSpec::text("name", "Name"), &row), "");
        assert_eq!(export_value(&ColumnSpec::date("created", "Created"), &row), "03/05/2024");
    }
}
