// crates/leap-cli/src/export.rs
// ============================================================================
// Module: Log Export
// Description: Stream an experiment's full call log as JSON lines or CSV.
// Purpose: Hand logs to analysis tools outside the server.
// Dependencies: leap-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! Export walks the log in `earliest` order with the id cursor, one page at
//! a time, so memory stays bounded by the page size. CSV rows carry `args`
//! and `result` as JSON text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::str::FromStr;

use leap_core::CallLogEntry;
use leap_core::ExperimentContext;
use leap_core::LogOrder;
use leap_core::LogQuery;

use crate::csv_format::format_record;
use crate::error::ToolError;

// ============================================================================
// SECTION: Format
// ============================================================================

/// Rows fetched per page.
pub const EXPORT_PAGE_SIZE: i64 = 5_000;

/// CSV column order.
pub const CSV_COLUMNS: [&str; 9] =
    ["id", "ts", "student_id", "experiment", "trial", "func_name", "args", "result", "error"];

/// Export encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// One JSON object per line.
    #[default]
    JsonLines,
    /// RFC 4180 CSV with a header row.
    Csv,
}

impl ExportFormat {
    /// Conventional file extension.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::JsonLines => "jsonl",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "jsonl" | "jsonlines" => Ok(Self::JsonLines),
            "csv" => Ok(Self::Csv),
            other => Err(format!("Unknown format '{other}'. Use 'jsonl' or 'csv'.")),
        }
    }
}

// ============================================================================
// SECTION: Export
// ============================================================================

/// Writes every log entry of `ctx` to `out`; returns the number of rows.
///
/// An empty log writes nothing, not even the CSV header.
///
/// # Errors
///
/// Returns [`ToolError`] when the store cannot be read or `out` fails.
pub fn export_logs<W: Write>(
    ctx: &ExperimentContext,
    format: ExportFormat,
    out: &mut W,
) -> Result<usize, ToolError> {
    let mut query = LogQuery {
        limit: EXPORT_PAGE_SIZE,
        order: LogOrder::Earliest,
        ..LogQuery::default()
    };
    let mut total = 0;
    loop {
        let page = ctx.query_logs(&query)?;
        if total == 0 && !page.is_empty() && format == ExportFormat::Csv {
            write_out(out, format_record(CSV_COLUMNS).as_bytes())?;
        }
        for entry in &page {
            write_entry(entry, format, out)?;
        }
        total += page.len();
        match page.last() {
            Some(last) if page.len() == page_len(EXPORT_PAGE_SIZE) => query.after_id = Some(last.id),
            _ => break,
        }
    }
    out.flush().map_err(|err| ToolError::Io(format!("failed to flush export: {err}")))?;
    tracing::debug!(rows = total, format = format.extension(), "log export finished");
    Ok(total)
}

/// Page size as a length.
fn page_len(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Encodes one entry.
fn write_entry<W: Write>(
    entry: &CallLogEntry,
    format: ExportFormat,
    out: &mut W,
) -> Result<(), ToolError> {
    match format {
        ExportFormat::JsonLines => {
            let mut line = serde_json::to_string(entry)
                .map_err(|err| ToolError::Invalid(format!("failed to encode log {}: {err}", entry.id)))?;
            line.push('\n');
            write_out(out, line.as_bytes())
        }
        ExportFormat::Csv => {
            let record = format_record([
                entry.id.to_string(),
                entry.ts.to_string(),
                entry.student_id.clone(),
                entry.experiment.clone(),
                entry.trial.clone().unwrap_or_default(),
                entry.func_name.clone(),
                entry.args.to_string(),
                entry.result.to_string(),
                entry.error.clone().unwrap_or_default(),
            ]);
            write_out(out, record.as_bytes())
        }
    }
}

/// Writes bytes with a uniform error.
fn write_out<W: Write>(out: &mut W, bytes: &[u8]) -> Result<(), ToolError> {
    out.write_all(bytes).map_err(|err| ToolError::Io(format!("failed to write export: {err}")))
}
