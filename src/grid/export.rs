//! CSV and spreadsheet export of grid rows
//!
//! Spreadsheet output needs the `xlsx` feature. When it is missing, or
//! encoding fails, export falls back to CSV.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::column::ColumnSpec;
use super::record::GridRecord;
use super::render::export_value;
use crate::error::ExportError;

/// One exported row: `(header, value)` pairs in column order
pub type ExportRow = Vec<(String, String)>;

/// Caller-supplied replacement for the default column projection
pub type ExportTransform = Arc<dyn Fn(&[&GridRecord]) -> Vec<ExportRow> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// Encoded export ready to be written
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write into `dir`, returning the full path
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes).map_err(|e| ExportError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Export written");
        Ok(path)
    }
}

/// Project records onto the exportable columns (everything except actions)
pub fn export_rows(records: &[&GridRecord], columns: &[ColumnSpec]) -> Vec<ExportRow> {
    records
        .iter()
        .map(|record| {
            columns
                .iter()
                .filter(|c| !c.is_actions())
                .map(|c| (c.export_header_name().to_string(), export_value(c, record)))
                .collect()
        })
        .collect()
}

/// Header list, taken from the first row
pub fn headers(rows: &[ExportRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.iter().map(|(header, _)| header.clone()).collect())
        .unwrap_or_default()
}

fn cell<'a>(row: &'a ExportRow, header: &str) -> &'a str {
    row.iter()
        .find(|(h, _)| h == header)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

/// Encode rows as CSV. No rows yields empty output.
pub fn to_csv(rows: &[ExportRow]) -> String {
    let headers = headers(rows);
    if headers.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| csv_escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            headers
                .iter()
                .map(|h| csv_escape(cell(row, h)))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

/// Escape a value for CSV
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Encode rows as a single-sheet workbook with a bold header row
#[cfg(feature = "xlsx")]
pub fn to_xlsx(rows: &[ExportRow], sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    use rust_xlsxwriter::{Format, Workbook};

    let encode = |e: rust_xlsxwriter::XlsxError| ExportError::Encode {
        format: "xlsx".into(),
        reason: e.to_string(),
    };
    let too_large = || ExportError::Encode {
        format: "xlsx".into(),
        reason: "too many rows or columns".into(),
    };

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).map_err(encode)?;

    let headers = headers(rows);
    for (col, header) in headers.iter().enumerate() {
        let col = u16::try_from(col).map_err(|_| too_large())?;
        worksheet
            .write_string_with_format(0, col, header.as_str(), &bold)
            .map_err(encode)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let row_num = u32::try_from(index + 1).map_err(|_| too_large())?;
        for (col, header) in headers.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| too_large())?;
            worksheet
                .write_string(row_num, col, cell(row, header))
                .map_err(encode)?;
        }
    }

    workbook.save_to_buffer().map_err(encode)
}

#[cfg(not(feature = "xlsx"))]
pub fn to_xlsx(_rows: &[ExportRow], _sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    Err(ExportError::LibraryUnavailable)
}

/// `<base>_<YYYY-MM-DD>.<ext>`
pub fn file_name(base: &str, date: NaiveDate, format: ExportFormat) -> String {
    format!("{}_{}.{}", base, date.format("%Y-%m-%d"), format.extension())
}

/// Encode rows in `format`. A spreadsheet that cannot be produced is
/// replaced by CSV, so this never fails.
pub fn export(
    rows: &[ExportRow],
    format: ExportFormat,
    base_name: &str,
    sheet_name: &str,
    date: NaiveDate,
) -> ExportArtifact {
    if format == ExportFormat::Xlsx {
        match to_xlsx(rows, sheet_name) {
            Ok(bytes) => {
                return ExportArtifact {
                    format,
                    file_name: file_name(base_name, date, format),
                    bytes,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Spreadsheet export failed, falling back to CSV");
            }
        }
    }

    ExportArtifact {
        format: ExportFormat::Csv,
        file_name: file_name(base_name, date, ExportFormat::Csv),
        bytes: to_csv(rows).into_bytes(),
    }
}
