// crates/leap-core/src/core/student.rs
// ============================================================================
// Module: LEAP Students
// Description: Registered student record.
// Purpose: Represent a student admitted to one experiment.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Student`] is created by an explicit registration action and removed by
//! an admin delete, which also removes the student's call log history.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::StudentId;

// ============================================================================
// SECTION: Student
// ============================================================================

/// Registered student within one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Unique student identifier.
    pub student_id: StudentId,
    /// Display name.
    pub name: String,
    /// Optional contact email.
    pub email: Option<String>,
}

impl Student {
    /// Creates a new student record.
    #[must_use]
    pub fn new(student_id: StudentId, name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            student_id,
            name: name.into(),
            email,
        }
    }
}
