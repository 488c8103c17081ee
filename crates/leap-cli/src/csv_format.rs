// crates/leap-cli/src/csv_format.rs
// ============================================================================
// Module: CSV Records
// Description: RFC 4180 record writing and reading.
// Purpose: Export log rows and import student rosters as CSV.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Fields containing a comma, a double quote, or a line break are quoted and
//! inner quotes are doubled. Records end with CRLF. The reader accepts CRLF
//! or LF line endings, quoted fields spanning lines, and skips blank lines.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;

use crate::error::ToolError;

// ============================================================================
// SECTION: Writing
// ============================================================================

/// Quotes `field` when RFC 4180 requires it.
#[must_use]
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Formats one record terminated by CRLF.
#[must_use]
pub fn format_record<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (index, field) in fields.into_iter().enumerate() {
        if index > 0 {
            line.push(',');
        }
        line.push_str(&escape_field(field.as_ref()));
    }
    line.push_str("\r\n");
    line
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// One parsed record with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// 1-based line number of the record start.
    pub line: usize,
    /// Field values with quoting removed.
    pub fields: Vec<String>,
}

/// Parses CSV text into records.
///
/// # Errors
///
/// Returns [`ToolError::Csv`] for an unterminated quoted field or text after
/// a closing quote.
pub fn parse_records(text: &str) -> Result<Vec<CsvRecord>, ToolError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                other => field.push(other),
            }
            continue;
        }
        match ch {
            ',' => {
                fields.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                after_quote = false;
                line += 1;
                record_line = line;
            }
            _ if after_quote => {
                return Err(ToolError::Csv {
                    line,
                    message: "unexpected text after closing quote".to_string(),
                });
            }
            '"' if field.is_empty() => in_quotes = true,
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(ToolError::Csv {
            line: record_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !fields.is_empty() || after_quote {
        fields.push(field);
        push_record(&mut records, record_line, fields);
    }
    Ok(records)
}

/// Appends a record unless it is a blank line.
fn push_record(records: &mut Vec<CsvRecord>, line: usize, fields: Vec<String>) {
    if !matches!(fields.as_slice(), [only] if only.is_empty()) {
        records.push(CsvRecord {
            line,
            fields,
        });
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
