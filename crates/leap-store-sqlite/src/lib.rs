// crates/leap-store-sqlite/src/lib.rs
// ============================================================================
// Module: LEAP SQLite Store
// Description: SQLite-backed experiment stores and their opener.
// Purpose: Give every experiment its own durable database file.
// Dependencies: leap-core, rusqlite
// ============================================================================

//! ## Overview
//! Provides [`SqliteExperimentStore`] and [`SqliteStoreOpener`], which the
//! experiment registry uses to open one database per experiment directory.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use leap_core::ExperimentName;
use leap_core::SharedExperimentStore;
use leap_core::StoreError;
use leap_core::StoreOpener;
use tracing::info;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_BUSY_TIMEOUT_MS;
pub use store::SqliteExperimentStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;

// ============================================================================
// SECTION: Opener
// ============================================================================

/// Database file location relative to an experiment directory.
pub const DEFAULT_DB_FILE: &str = "db/experiment.db";

/// Opens `<experiment dir>/<db_file>` for each discovered experiment.
#[derive(Debug, Clone)]
pub struct SqliteStoreOpener {
    /// Relative database path inside each experiment directory.
    pub db_file: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Journal mode applied to every database.
    pub journal_mode: SqliteStoreMode,
    /// Sync mode applied to every database.
    pub sync_mode: SqliteSyncMode,
}

impl Default for SqliteStoreOpener {
    fn default() -> Self {
        Self {
            db_file: PathBuf::from(DEFAULT_DB_FILE),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl SqliteStoreOpener {
    /// Returns the store config for one experiment directory.
    #[must_use]
    pub fn config_for(&self, dir: &Path) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: dir.join(&self.db_file),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

impl StoreOpener for SqliteStoreOpener {
    fn open(
        &self,
        experiment: &ExperimentName,
        dir: &Path,
    ) -> Result<SharedExperimentStore, StoreError> {
        let config = self.config_for(dir);
        let store = SqliteExperimentStore::new(config).map_err(StoreError::from)?;
        info!(experiment = %experiment, path = %store.path().display(), "experiment store ready");
        Ok(SharedExperimentStore::from_store(store))
    }
}
