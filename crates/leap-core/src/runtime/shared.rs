// crates/leap-core/src/runtime/shared.rs
// ============================================================================
// Module: LEAP Shared Store
// Description: Clonable handle over any experiment store backend.
// Purpose: Let registries and handlers share one backend per experiment.
// Dependencies: crate::interfaces
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::CallLogEntry;
use crate::core::LogOptions;
use crate::core::LogQuery;
use crate::core::NewCallLog;
use crate::core::Student;
use crate::interfaces::CallLogStore;
use crate::interfaces::ExperimentStore;
use crate::interfaces::StoreError;
use crate::interfaces::StudentRegistry;

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Experiment store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedExperimentStore {
    /// Inner store implementation.
    inner: Arc<dyn ExperimentStore + Send + Sync>,
}

impl SharedExperimentStore {
    /// Wraps a store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl ExperimentStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn ExperimentStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl std::fmt::Debug for SharedExperimentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedExperimentStore").finish_non_exhaustive()
    }
}

impl StudentRegistry for SharedExperimentStore {
    fn add_student(&self, student: &Student) -> Result<Student, StoreError> {
        self.inner.add_student(student)
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        self.inner.list_students()
    }

    fn delete_student(&self, student_id: &str) -> Result<bool, StoreError> {
        self.inner.delete_student(student_id)
    }

    fn is_registered(&self, student_id: &str) -> Result<bool, StoreError> {
        self.inner.is_registered(student_id)
    }

    fn count_students(&self) -> Result<u64, StoreError> {
        self.inner.count_students()
    }
}

impl CallLogStore for SharedExperimentStore {
    fn append_log(&self, record: &NewCallLog) -> Result<CallLogEntry, StoreError> {
        self.inner.append_log(record)
    }

    fn query_logs(&self, query: &LogQuery) -> Result<Vec<CallLogEntry>, StoreError> {
        self.inner.query_logs(query)
    }

    fn log_options(&self) -> Result<LogOptions, StoreError> {
        self.inner.log_options()
    }

    fn count_logs(&self) -> Result<u64, StoreError> {
        self.inner.count_logs()
    }
}
