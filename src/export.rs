use crate::api::models::Row;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ExportError {
    /// The tab has no result rows to export.
    EmptyDataset,
    Csv(csv::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::EmptyDataset => write!(f, "No data available to export"),
            ExportError::Csv(e) => write!(f, "CSV write error: {}", e),
        }
    }
}

impl Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e)
    }
}

/// Renders a result set as a CSV document. The header row comes from the
/// first record's keys, in their original order; later records are read
/// through that same key set, so extra keys are ignored and missing ones
/// come out blank.
pub fn rows_to_csv(rows: &[Row]) -> Result<Vec<u8>, ExportError> {
    let first = rows.first().ok_or(ExportError::EmptyDataset)?;
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;

    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|key| cell_text(row.get(*key)))
            .collect();
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}

/// Null and missing cells export as empty fields; strings are trimmed,
/// nested values fall back to their compact JSON form.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}
