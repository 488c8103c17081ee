// crates/leap-core/src/interfaces/mod.rs
// ============================================================================
// Module: LEAP Interfaces
// Description: Backend-agnostic interfaces for student and call log storage.
// Purpose: Define the contract surfaces used by the RPC executor and registry.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how LEAP persists students and call logs without
//! embedding backend-specific details. Every store is scoped to exactly one
//! experiment; implementations run each operation as one short transaction
//! and report connectivity failures as [`StoreError::Unavailable`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use thiserror::Error;

use crate::core::CallLogEntry;
use crate::core::ExperimentName;
use crate::core::LogOptions;
use crate::core::LogQuery;
use crate::core::NewCallLog;
use crate::core::Student;
use crate::runtime::SharedExperimentStore;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage errors shared by all backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record with the same key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// Backend cannot be reached or written.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("storage corruption: {0}")]
    Corrupt(String),
    /// Stored schema version is incompatible.
    #[error("storage version mismatch: {0}")]
    VersionMismatch(String),
    /// Request or stored data is invalid.
    #[error("storage invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Student Registry
// ============================================================================

/// Persisted set of registered students.
pub trait StudentRegistry {
    /// Registers a new student.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] when the id is already present.
    fn add_student(&self, student: &Student) -> Result<Student, StoreError>;

    /// Lists all students ordered by id ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Deletes a student and every log entry carrying its id.
    ///
    /// Returns false when no such student exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn delete_student(&self, student_id: &str) -> Result<bool, StoreError>;

    /// Returns true when `student_id` is registered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn is_registered(&self, student_id: &str) -> Result<bool, StoreError>;

    /// Returns the number of registered students.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn count_students(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Call Log Store
// ============================================================================

/// Append-only call log with cursor pagination.
pub trait CallLogStore {
    /// Appends a record, assigning the next id and the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the backend cannot be written.
    fn append_log(&self, record: &NewCallLog) -> Result<CallLogEntry, StoreError>;

    /// Returns one page of entries matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn query_logs(&self, query: &LogQuery) -> Result<Vec<CallLogEntry>, StoreError>;

    /// Returns registered students, distinct trials, and the entry count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn log_options(&self) -> Result<LogOptions, StoreError>;

    /// Returns the total number of entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn count_logs(&self) -> Result<u64, StoreError>;
}

// ============================================================================
// SECTION: Experiment Store
// ============================================================================

/// Combined per-experiment storage handle.
pub trait ExperimentStore: StudentRegistry + CallLogStore {}

impl<T: StudentRegistry + CallLogStore + ?Sized> ExperimentStore for T {}

/// Opens the storage handle for one experiment directory.
pub trait StoreOpener: Send + Sync {
    /// Opens (creating when absent) the store for `experiment` rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be opened.
    fn open(&self, experiment: &ExperimentName, dir: &Path) -> Result<SharedExperimentStore, StoreError>;
}
