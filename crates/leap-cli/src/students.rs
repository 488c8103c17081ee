// crates/leap-cli/src/students.rs
// ============================================================================
// Module: Student Roster Import
// Description: Bulk registration from a CSV roster.
// Purpose: Register a class in one step before an experiment opens.
// Dependencies: leap-core
// ============================================================================

//! ## Overview
//! The roster needs a header row naming a `student_id` column; `name` and
//! `email` columns are optional. A missing name falls back to the id and an
//! empty email is stored as absent. Rows with malformed ids or ids that are
//! already registered are skipped and reported; storage failures abort.

// ============================================================================
// SECTION: Imports
// ============================================================================

use leap_core::ExperimentContext;
use leap_core::StudentError;

use crate::csv_format::CsvRecord;
use crate::csv_format::parse_records;
use crate::error::ToolError;

// ============================================================================
// SECTION: Report
// ============================================================================

/// A roster row that was not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Line where the row starts.
    pub line: usize,
    /// Student id as written.
    pub student_id: String,
    /// Reason the row was skipped.
    pub reason: String,
}

/// Import outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Newly registered ids in roster order.
    pub added: Vec<String>,
    /// Rows left out.
    pub skipped: Vec<SkippedRow>,
}

// ============================================================================
// SECTION: Import
// ============================================================================

/// Column positions resolved from the header row.
struct RosterColumns {
    /// `student_id` column.
    student_id: usize,
    /// Optional `name` column.
    name: Option<usize>,
    /// Optional `email` column.
    email: Option<usize>,
}

impl RosterColumns {
    /// Resolves columns by case-insensitive header name.
    fn from_header(header: &CsvRecord) -> Result<Self, ToolError> {
        let find = |wanted: &str| {
            header.fields.iter().position(|field| field.trim().eq_ignore_ascii_case(wanted))
        };
        let student_id = find("student_id").ok_or_else(|| ToolError::Csv {
            line: header.line,
            message: "header must contain a student_id column".to_string(),
        })?;
        Ok(Self {
            student_id,
            name: find("name"),
            email: find("email"),
        })
    }
}

/// Registers every roster row in `csv_text` with `ctx`.
///
/// # Errors
///
/// Returns [`ToolError`] for malformed CSV, a missing header, or a storage
/// failure.
pub fn import_students(ctx: &ExperimentContext, csv_text: &str) -> Result<ImportReport, ToolError> {
    let records = parse_records(csv_text)?;
    let Some((header, rows)) = records.split_first() else {
        return Err(ToolError::Csv {
            line: 1,
            message: "roster is empty".to_string(),
        });
    };
    let columns = RosterColumns::from_header(header)?;
    let mut report = ImportReport::default();
    for row in rows {
        let cell = |index: usize| row.fields.get(index).map_or("", |value| value.trim());
        let student_id = cell(columns.student_id);
        let name = columns.name.map(cell).filter(|value| !value.is_empty()).unwrap_or(student_id);
        let email = columns.email.map(cell).filter(|value| !value.is_empty());
        match ctx.add_student(student_id, name, email) {
            Ok(student) => report.added.push(student.student_id.to_string()),
            Err(err @ (StudentError::InvalidIdentity(_) | StudentError::AlreadyExists(_))) => {
                report.skipped.push(SkippedRow {
                    line: row.line,
                    student_id: student_id.to_string(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(report)
}
