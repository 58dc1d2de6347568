//! Ledger export: JSON and CSV renderings plus download file names

use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use super::StorageError;
use crate::types::TaskResult;

pub const CSV_HEADER: &str = "time,task,value,units,status,note";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    /// Render `results` in this format.
    pub fn render(&self, results: &[TaskResult]) -> Result<String, StorageError> {
        match self {
            ExportFormat::Json => to_json(results),
            ExportFormat::Csv => Ok(to_csv(results)),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{other}' (expected json or csv)")),
        }
    }
}

/// Pretty-printed JSON array, same field layout as the persisted blob.
pub fn to_json(results: &[TaskResult]) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// CSV with header `time,task,value,units,status,note`, one row per result.
pub fn to_csv(results: &[TaskResult]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + results.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in results {
        let note = r.note.as_deref().map(sanitize_note).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            r.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            r.task.code(),
            r.value,
            r.units,
            r.status.as_str(),
            note
        ));
    }
    out
}

/// Collapse each run of commas, CR or LF into a single space.
pub fn sanitize_note(note: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    let re = SEPARATORS
        .get_or_init(|| Regex::new(r"[,\r\n]+").expect("separator pattern compiles"));
    re.replace_all(note, " ").into_owned()
}

/// `session_<YYYY-MM-DDTHH:MM:SS>.<ext>`
pub fn export_file_name(at: DateTime<Utc>, format: ExportFormat) -> String {
    format!(
        "session_{}.{}",
        at.format("%Y-%m-%dT%H:%M:%S"),
        format.extension()
    )
}
