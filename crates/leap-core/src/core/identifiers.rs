// crates/leap-core/src/core/identifiers.rs
// ============================================================================
// Module: LEAP Identifiers
// Description: Validated identifiers for students and experiments.
// Purpose: Provide strongly typed IDs with stable string forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Student identifiers are caller-supplied and restricted to
//! `[a-zA-Z0-9_-]{1,255}`. Experiment names come from directory names and are
//! restricted to `^[a-z0-9][a-z0-9_-]*$`. Both wrappers validate on
//! construction and on deserialization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a student identifier.
pub const MAX_STUDENT_ID_LENGTH: usize = 255;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Student identifier fails the format check.
    #[error("Invalid student_id: '{0}'")]
    InvalidStudentId(String),
    /// Experiment name fails the format check.
    #[error("Invalid experiment name: '{0}'")]
    InvalidExperimentName(String),
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Returns true when `value` is a well-formed student identifier.
#[must_use]
pub fn is_valid_student_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_STUDENT_ID_LENGTH
        && value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
}

/// Returns true when `value` is a well-formed experiment name.
#[must_use]
pub fn is_valid_experiment_name(value: &str) -> bool {
    let mut bytes = value.bytes();
    let Some(first) = bytes.next() else {
        return false;
    };
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return false;
    }
    bytes.all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_' || byte == b'-')
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Student identifier, unique within one experiment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    /// Parses and validates a student identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidStudentId`] when the format check fails.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if is_valid_student_id(&value) {
            Ok(Self(value))
        } else {
            Err(IdentifierError::InvalidStudentId(value))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for StudentId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StudentId> for String {
    fn from(value: StudentId) -> Self {
        value.0
    }
}

/// Experiment name, unique within one experiments root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parses and validates an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidExperimentName`] when the format check
    /// fails.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if is_valid_experiment_name(&value) {
            Ok(Self(value))
        } else {
            Err(IdentifierError::InvalidExperimentName(value))
        }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ExperimentName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ExperimentName> for String {
    fn from(value: ExperimentName) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn student_id_accepts_allowed_charset() {
        assert!(is_valid_student_id("s001"));
        assert!(is_valid_student_id("Alice_Smith-2"));
        assert!(is_valid_student_id(&"a".repeat(MAX_STUDENT_ID_LENGTH)));
    }

    #[test]
    fn student_id_rejects_bad_input() {
        assert!(!is_valid_student_id(""));
        assert!(!is_valid_student_id("has space"));
        assert!(!is_valid_student_id("dot.name"));
        assert!(!is_valid_student_id("ünï"));
        assert!(!is_valid_student_id(&"a".repeat(MAX_STUDENT_ID_LENGTH + 1)));
    }

    #[test]
    fn experiment_name_rules() {
        assert!(is_valid_experiment_name("default"));
        assert!(is_valid_experiment_name("0-intro_lab"));
        assert!(!is_valid_experiment_name(""));
        assert!(!is_valid_experiment_name("_hidden"));
        assert!(!is_valid_experiment_name("-dash"));
        assert!(!is_valid_experiment_name("Upper"));
        assert!(!is_valid_experiment_name("with space"));
    }

    #[test]
    fn student_id_deserialization_validates() {
        let ok: StudentId = serde_json::from_str("\"s001\"").unwrap();
        assert_eq!(ok.as_str(), "s001");
        assert!(serde_json::from_str::<StudentId>("\"bad id\"").is_err());
    }
}
