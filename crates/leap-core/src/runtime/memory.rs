// crates/leap-core/src/runtime/memory.rs
// ============================================================================
// Module: LEAP In-Memory Store
// Description: Simple in-memory experiment store for tests and demos.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`StudentRegistry`]
//! and [`CallLogStore`] for tests and local demos. It follows the same id,
//! cascade, and pagination rules as the durable backend. It is not intended
//! for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::CallLogEntry;
use crate::core::ExperimentName;
use crate::core::LogOptions;
use crate::core::LogOrder;
use crate::core::LogQuery;
use crate::core::NewCallLog;
use crate::core::Student;
use crate::core::Timestamp;
use crate::interfaces::CallLogStore;
use crate::interfaces::StoreError;
use crate::interfaces::StoreOpener;
use crate::interfaces::StudentRegistry;
use crate::runtime::shared::SharedExperimentStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable state behind the store mutex.
#[derive(Debug, Default)]
struct MemoryState {
    /// Students keyed by id.
    students: BTreeMap<String, Student>,
    /// Log entries in id order.
    logs: Vec<CallLogEntry>,
    /// Last assigned log id; never decreases.
    last_id: i64,
}

/// In-memory experiment store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryExperimentStore {
    /// State protected by a mutex.
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryExperimentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("experiment store mutex poisoned".to_string()))
    }
}

impl StudentRegistry for InMemoryExperimentStore {
    fn add_student(&self, student: &Student) -> Result<Student, StoreError> {
        let mut guard = self.lock()?;
        let key = student.student_id.as_str().to_string();
        if guard.students.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!("Student '{key}' already exists")));
        }
        guard.students.insert(key, student.clone());
        Ok(student.clone())
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.lock()?.students.values().cloned().collect())
    }

    fn delete_student(&self, student_id: &str) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        if guard.students.remove(student_id).is_none() {
            return Ok(false);
        }
        guard.logs.retain(|entry| entry.student_id != student_id);
        Ok(true)
    }

    fn is_registered(&self, student_id: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.students.contains_key(student_id))
    }

    fn count_students(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.students.len() as u64)
    }
}

impl CallLogStore for InMemoryExperimentStore {
    fn append_log(&self, record: &NewCallLog) -> Result<CallLogEntry, StoreError> {
        let mut guard = self.lock()?;
        guard.last_id += 1;
        let entry = record.clone().into_entry(guard.last_id, Timestamp::now());
        guard.logs.push(entry.clone());
        Ok(entry)
    }

    fn query_logs(&self, query: &LogQuery) -> Result<Vec<CallLogEntry>, StoreError> {
        let guard = self.lock()?;
        let limit = usize::try_from(query.effective_limit()).unwrap_or(usize::MAX);
        let matching = guard.logs.iter().filter(|entry| query.matches(entry)).cloned();
        let page: Vec<CallLogEntry> = match query.order {
            LogOrder::Latest => matching.rev().take(limit).collect(),
            LogOrder::Earliest => matching.take(limit).collect(),
        };
        Ok(page)
    }

    fn log_options(&self) -> Result<LogOptions, StoreError> {
        let guard = self.lock()?;
        let trials: BTreeSet<String> =
            guard.logs.iter().filter_map(|entry| entry.trial.clone()).collect();
        Ok(LogOptions {
            students: guard.students.keys().cloned().collect(),
            trials: trials.into_iter().collect(),
            log_count: guard.logs.len() as u64,
        })
    }

    fn count_logs(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.logs.len() as u64)
    }
}

// ============================================================================
// SECTION: Opener
// ============================================================================

/// Opens a fresh in-memory store for every experiment.
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryStoreOpener;

impl StoreOpener for InMemoryStoreOpener {
    fn open(
        &self,
        _experiment: &ExperimentName,
        _dir: &Path,
    ) -> Result<SharedExperimentStore, StoreError> {
        Ok(SharedExperimentStore::from_store(InMemoryExperimentStore::new()))
    }
}
