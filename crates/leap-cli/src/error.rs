// crates/leap-cli/src/error.rs
// ============================================================================
// Module: LEAP Tool Errors
// Description: Error type shared by the administration helpers.
// Purpose: Carry filesystem, CSV, and core failures to the CLI surface.
// Dependencies: leap-core, thiserror
// ============================================================================

use leap_core::IdentifierError;
use leap_core::RegistryError;
use leap_core::StoreError;
use leap_core::StudentError;
use thiserror::Error;

/// Administration helper failures.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Filesystem failure with context.
    #[error("{0}")]
    Io(String),
    /// Invalid user input or project layout.
    #[error("{0}")]
    Invalid(String),
    /// Malformed CSV input.
    #[error("csv line {line}: {message}")]
    Csv {
        /// 1-based line where the record starts.
        line: usize,
        /// Failure description.
        message: String,
    },
    /// Experiment could not be loaded.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Experiment storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Student administration failed.
    #[error(transparent)]
    Student(#[from] StudentError),
}

impl From<IdentifierError> for ToolError {
    fn from(err: IdentifierError) -> Self {
        Self::Invalid(err.to_string())
    }
}
