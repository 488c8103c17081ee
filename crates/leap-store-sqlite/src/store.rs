// crates/leap-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Experiment Store
// Description: Durable student registry and call log backed by SQLite WAL.
// Purpose: Persist one experiment's students and call records in one file.
// Dependencies: leap-core, rusqlite, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements [`StudentRegistry`] and [`CallLogStore`] over one
//! `SQLite` database file per experiment. Log ids come from an
//! `AUTOINCREMENT` key so they increase strictly and are never reused, even
//! after a student's history is deleted. Every operation runs in its own
//! short transaction on a mutex-guarded connection. Stored payloads are
//! treated as untrusted and decoded defensively.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use leap_core::CallLogEntry;
use leap_core::CallLogStore;
use leap_core::LogOptions;
use leap_core::LogOrder;
use leap_core::LogQuery;
use leap_core::NewCallLog;
use leap_core::StoreError;
use leap_core::Student;
use leap_core::StudentId;
use leap_core::StudentRegistry;
use leap_core::Timestamp;
use leap_core::decode_payload;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Columns selected for every log row, in [`read_entry`] order.
const LOG_COLUMNS: &str =
    "id, ts_us, student_id, experiment, trial, func_name, args_json, result_json, error";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for one experiment database.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows violate store invariants.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or request.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Primary key already present.
    #[error("{0}")]
    AlreadyExists(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => {
                Self::Unavailable(message)
            }
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::AlreadyExists(message) => Self::AlreadyExists(message),
        }
    }
}

/// Maps an engine error into the store error.
#[allow(clippy::needless_pass_by_value, reason = "Used directly as a map_err callback.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed experiment store with WAL support.
#[derive(Clone)]
pub struct SqliteExperimentStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteExperimentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExperimentStore").field("config", &self.config).finish_non_exhaustive()
    }
}

impl SqliteExperimentStore {
    /// Opens (creating when absent) an experiment database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        debug!(path = %config.path.display(), "opened experiment database");
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Runs `work` inside one transaction and commits it.
    fn with_transaction<T>(
        &self,
        work: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(db_error)?;
        let output = work(&tx)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(output)
    }
}

impl StudentRegistry for SqliteExperimentStore {
    fn add_student(&self, student: &Student) -> Result<Student, StoreError> {
        self.with_transaction(|tx| {
            let id = student.student_id.as_str();
            let existing: Option<i64> = tx
                .query_row("SELECT 1 FROM students WHERE student_id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(db_error)?;
            if existing.is_some() {
                return Err(SqliteStoreError::AlreadyExists(format!(
                    "Student '{id}' already exists"
                )));
            }
            tx.execute(
                "INSERT INTO students (student_id, name, email) VALUES (?1, ?2, ?3)",
                params![id, student.name, student.email],
            )
            .map_err(db_error)?;
            Ok(student.clone())
        })
        .map_err(StoreError::from)
    }

    fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        self.with_transaction(|tx| {
            let mut stmt = tx
                .prepare("SELECT student_id, name, email FROM students ORDER BY student_id")
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get(2)?))
                })
                .map_err(db_error)?;
            let mut students = Vec::new();
            for row in rows {
                let (id, name, email) = row.map_err(db_error)?;
                let student_id = StudentId::parse(id)
                    .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
                students.push(Student::new(student_id, name, email));
            }
            Ok(students)
        })
        .map_err(StoreError::from)
    }

    fn delete_student(&self, student_id: &str) -> Result<bool, StoreError> {
        self.with_transaction(|tx| {
            let removed = tx
                .execute("DELETE FROM students WHERE student_id = ?1", params![student_id])
                .map_err(db_error)?;
            if removed == 0 {
                return Ok(false);
            }
            let logs = tx
                .execute("DELETE FROM logs WHERE student_id = ?1", params![student_id])
                .map_err(db_error)?;
            debug!(student_id, logs, "deleted student and call history");
            Ok(true)
        })
        .map_err(StoreError::from)
    }

    fn is_registered(&self, student_id: &str) -> Result<bool, StoreError> {
        self.with_transaction(|tx| {
            let found: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM students WHERE student_id = ?1",
                    params![student_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?;
            Ok(found.is_some())
        })
        .map_err(StoreError::from)
    }

    fn count_students(&self) -> Result<u64, StoreError> {
        self.with_transaction(|tx| count_rows(tx, "students")).map_err(StoreError::from)
    }
}

impl CallLogStore for SqliteExperimentStore {
    fn append_log(&self, record: &NewCallLog) -> Result<CallLogEntry, StoreError> {
        let args_json = serde_json::to_string(&record.args_value())
            .map_err(|err| StoreError::Invalid(err.to_string()))?;
        let result = record.result_value();
        let result_json = if result.is_null() {
            None
        } else {
            Some(serde_json::to_string(&result).map_err(|err| StoreError::Invalid(err.to_string()))?)
        };
        let (id, ts) = self
            .with_transaction(|tx| {
                // Stamp under the connection lock: ts order follows id order.
                let ts = Timestamp::now();
                tx.execute(
                    "INSERT INTO logs (ts_us, student_id, experiment, trial, func_name, \
                     args_json, result_json, error) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        ts.unix_micros(),
                        record.student_id,
                        record.experiment,
                        record.trial,
                        record.func_name,
                        args_json,
                        result_json,
                        record.error
                    ],
                )
                .map_err(db_error)?;
                Ok((tx.last_insert_rowid(), ts))
            })
            .map_err(StoreError::from)?;
        Ok(record.clone().into_entry(id, ts))
    }

    fn query_logs(&self, query: &LogQuery) -> Result<Vec<CallLogEntry>, StoreError> {
        let (sql, values) = build_log_query(query);
        self.with_transaction(|tx| {
            let mut stmt = tx.prepare(&sql).map_err(db_error)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), read_entry).map_err(db_error)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row.map_err(db_error)?);
            }
            Ok(entries)
        })
        .map_err(StoreError::from)
    }

    fn log_options(&self) -> Result<LogOptions, StoreError> {
        self.with_transaction(|tx| {
            let students = collect_strings(
                tx,
                "SELECT student_id FROM students ORDER BY student_id",
            )?;
            let trials = collect_strings(
                tx,
                "SELECT DISTINCT trial FROM logs WHERE trial IS NOT NULL ORDER BY trial",
            )?;
            let log_count = count_rows(tx, "logs")?;
            Ok(LogOptions {
                students,
                trials,
                log_count,
            })
        })
        .map_err(StoreError::from)
    }

    fn count_logs(&self) -> Result<u64, StoreError> {
        self.with_transaction(|tx| count_rows(tx, "logs")).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Query Building
// ============================================================================

/// Builds the filtered, ordered, limited log query and its bound values.
fn build_log_query(query: &LogQuery) -> (String, Vec<SqlValue>) {
    let mut clauses: Vec<&'static str> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();
    if let Some(student_id) = &query.student_id {
        clauses.push("student_id = ?");
        values.push(SqlValue::Text(student_id.clone()));
    }
    if let Some(trial) = &query.trial {
        clauses.push("trial = ?");
        values.push(SqlValue::Text(trial.clone()));
    }
    if let Some(func_name) = &query.func_name {
        clauses.push("func_name = ?");
        values.push(SqlValue::Text(func_name.clone()));
    }
    if let Some(start) = query.start {
        clauses.push("ts_us >= ?");
        values.push(SqlValue::Integer(start.unix_micros()));
    }
    if let Some(end) = query.end {
        clauses.push("ts_us <= ?");
        values.push(SqlValue::Integer(end.unix_micros()));
    }
    if let Some(cursor) = query.after_id {
        clauses.push(match query.order {
            LogOrder::Latest => "id < ?",
            LogOrder::Earliest => "id > ?",
        });
        values.push(SqlValue::Integer(cursor));
    }
    let mut sql = format!("SELECT {LOG_COLUMNS} FROM logs");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(match query.order {
        LogOrder::Latest => " ORDER BY id DESC",
        LogOrder::Earliest => " ORDER BY id ASC",
    });
    sql.push_str(" LIMIT ?");
    values.push(SqlValue::Integer(query.effective_limit()));
    (sql, values)
}

/// Maps one row selected with [`LOG_COLUMNS`] into an entry.
fn read_entry(row: &Row<'_>) -> rusqlite::Result<CallLogEntry> {
    let args_raw = payload_text(row, 6)?;
    let result_raw = payload_text(row, 7)?;
    Ok(CallLogEntry {
        id: row.get(0)?,
        ts: Timestamp::from_unix_micros(row.get(1)?),
        student_id: row.get(2)?,
        experiment: row.get(3)?,
        trial: row.get(4)?,
        func_name: row.get(5)?,
        args: decode_payload(args_raw.as_deref()),
        result: decode_payload(result_raw.as_deref()),
        error: row.get(8)?,
    })
}

/// Reads a payload column as text whatever its storage class.
fn payload_text(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(index)? {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}

/// Collects a single text column.
fn collect_strings(tx: &Transaction<'_>, sql: &str) -> Result<Vec<String>, SqliteStoreError> {
    let mut stmt = tx.prepare(sql).map_err(db_error)?;
    let rows = stmt.query_map(params![], |row| row.get::<_, String>(0)).map_err(db_error)?;
    let mut values = Vec::new();
    for row in rows {
        values.push(row.map_err(db_error)?);
    }
    Ok(values)
}

/// Counts rows in a fixed table.
fn count_rows(tx: &Transaction<'_>, table: &'static str) -> Result<u64, SqliteStoreError> {
    let count: i64 = tx
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| row.get(0))
        .map_err(db_error)?;
    u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt(format!("negative {table} count")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS students (
                    student_id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    email TEXT
                );
                CREATE TABLE IF NOT EXISTS logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ts_us INTEGER NOT NULL,
                    student_id TEXT NOT NULL,
                    experiment TEXT NOT NULL,
                    trial TEXT,
                    func_name TEXT NOT NULL,
                    args_json TEXT NOT NULL,
                    result_json TEXT,
                    error TEXT
                );
                CREATE INDEX IF NOT EXISTS ix_logs_ts ON logs (ts_us);
                CREATE INDEX IF NOT EXISTS ix_logs_student_id ON logs (student_id);
                CREATE INDEX IF NOT EXISTS ix_logs_func_name ON logs (func_name);
                CREATE INDEX IF NOT EXISTS ix_logs_trial ON logs (trial);
                CREATE INDEX IF NOT EXISTS ix_logs_student_func ON logs (student_id, func_name);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}
