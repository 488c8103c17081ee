// crates/leap-core/src/experiment/registry.rs
// ============================================================================
// Module: LEAP Experiment Registry
// Description: Experiment discovery and per-experiment runtime context.
// Purpose: Own one function mapping and one storage handle per experiment.
// Dependencies: crate::{core, functions, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`ExperimentRegistry::discover`] scans the immediate subdirectories of an
//! experiments root in sorted order. Each valid directory becomes an
//! [`ExperimentContext`] holding its metadata, its function mapping, and its
//! isolated store. Invalid names and per-experiment failures are logged and
//! skipped. Function reloads swap the whole mapping so concurrent callers see
//! either the old or the new set, never a mix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::CallLogEntry;
use crate::core::ExperimentName;
use crate::core::LogOptions;
use crate::core::LogQuery;
use crate::core::Student;
use crate::core::StudentId;
use crate::experiment::metadata::ExperimentMetadata;
use crate::experiment::metadata::ReadmeDocument;
use crate::functions::FunctionInfo;
use crate::functions::FunctionLibrary;
use crate::functions::FunctionSet;
use crate::functions::load_functions;
use crate::interfaces::CallLogStore;
use crate::interfaces::StoreError;
use crate::interfaces::StoreOpener;
use crate::interfaces::StudentRegistry;
use crate::runtime::CallRequest;
use crate::runtime::RpcError;
use crate::runtime::SharedExperimentStore;
use crate::runtime::execute;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// README file holding experiment metadata.
pub const README_FILE: &str = "README.md";
/// Directory holding function manifests.
pub const FUNCS_DIR: &str = "funcs";
/// Directory holding static UI pages.
pub const UI_DIR: &str = "ui";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry-level errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No experiment with this name is loaded.
    #[error("Experiment '{0}' not found")]
    NotFound(String),
    /// Experiment storage could not be opened.
    #[error("experiment '{experiment}' storage error: {source}")]
    Storage {
        /// Experiment name.
        experiment: String,
        /// Underlying store error.
        source: StoreError,
    },
    /// Experiment files could not be read.
    #[error("experiment '{experiment}' io error: {message}")]
    Io {
        /// Experiment name.
        experiment: String,
        /// Underlying error text.
        message: String,
    },
}

/// Student administration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudentError {
    /// Student id fails the format check.
    #[error("Invalid student_id: '{0}'")]
    InvalidIdentity(String),
    /// Student id is already registered.
    #[error("Student '{0}' already exists")]
    AlreadyExists(String),
    /// Backend failure.
    #[error(transparent)]
    Storage(StoreError),
}

// ============================================================================
// SECTION: Summaries
// ============================================================================

/// Experiment listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentSummary {
    /// Experiment name.
    pub name: String,
    /// Display name (falls back to the name).
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Version label.
    pub version: String,
    /// UI entry page.
    pub entry_point: String,
    /// Number of loaded functions.
    pub function_count: usize,
    /// Registration gating flag.
    pub require_registration: bool,
    /// Registered students; zero when storage cannot be read.
    pub student_count: u64,
}

// ============================================================================
// SECTION: Experiment Context
// ============================================================================

/// Runtime state of one experiment.
pub struct ExperimentContext {
    /// Validated experiment name.
    name: ExperimentName,
    /// Experiment directory.
    path: PathBuf,
    /// Typed metadata from the README.
    metadata: ExperimentMetadata,
    /// Library manifests resolve against.
    library: Arc<FunctionLibrary>,
    /// Current function mapping, swapped whole on reload.
    functions: RwLock<Arc<FunctionSet>>,
    /// Isolated student and log storage.
    store: SharedExperimentStore,
}

impl std::fmt::Debug for ExperimentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentContext")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl ExperimentContext {
    /// Builds a context and loads its functions from `path/funcs`.
    #[must_use]
    pub fn new(
        name: ExperimentName,
        path: PathBuf,
        metadata: ExperimentMetadata,
        library: Arc<FunctionLibrary>,
        store: SharedExperimentStore,
    ) -> Self {
        let functions = load_functions(&path.join(FUNCS_DIR), &library);
        Self {
            name,
            path,
            metadata,
            library,
            functions: RwLock::new(Arc::new(functions)),
            store,
        }
    }

    /// Loads an experiment directory: metadata, functions, and storage.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the store cannot be opened. An
    /// unreadable README falls back to default metadata.
    pub fn load(
        name: ExperimentName,
        path: &Path,
        library: Arc<FunctionLibrary>,
        opener: &dyn StoreOpener,
    ) -> Result<Self, RegistryError> {
        let metadata = match ReadmeDocument::read(&path.join(README_FILE)) {
            Ok(readme) => readme
                .map(|doc| ExperimentMetadata::from_frontmatter(&doc.frontmatter))
                .unwrap_or_default(),
            Err(err) => {
                warn!(experiment = %name, error = %err, "README unreadable; using default metadata");
                ExperimentMetadata::default()
            }
        };
        let store = opener.open(&name, path).map_err(|source| RegistryError::Storage {
            experiment: name.to_string(),
            source,
        })?;
        Ok(Self::new(name, path.to_path_buf(), metadata, library, store))
    }

    /// Returns the experiment name.
    #[must_use]
    pub const fn name(&self) -> &ExperimentName {
        &self.name
    }

    /// Returns the experiment directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the typed metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ExperimentMetadata {
        &self.metadata
    }

    /// Returns whether non-exempt functions require registration.
    #[must_use]
    pub const fn require_registration(&self) -> bool {
        self.metadata.require_registration
    }

    /// Returns the storage handle.
    #[must_use]
    pub const fn store(&self) -> &SharedExperimentStore {
        &self.store
    }

    /// Returns the README path.
    #[must_use]
    pub fn readme_path(&self) -> PathBuf {
        self.path.join(README_FILE)
    }

    /// Returns the function manifest directory.
    #[must_use]
    pub fn funcs_dir(&self) -> PathBuf {
        self.path.join(FUNCS_DIR)
    }

    /// Returns a snapshot of the current function mapping.
    #[must_use]
    pub fn functions(&self) -> Arc<FunctionSet> {
        match self.functions.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Re-scans the manifests and swaps in the new mapping; returns its size.
    pub fn reload_functions(&self) -> usize {
        let loaded = Arc::new(load_functions(&self.funcs_dir(), &self.library));
        let count = loaded.len();
        match self.functions.write() {
            Ok(mut guard) => *guard = loaded,
            Err(poisoned) => *poisoned.into_inner() = loaded,
        }
        info!(experiment = %self.name, count, "reloaded experiment functions");
        count
    }

    /// Returns the wire metadata of every loaded function.
    #[must_use]
    pub fn describe_functions(&self) -> BTreeMap<String, FunctionInfo> {
        self.functions().describe_all()
    }

    /// Returns the listing entry for this experiment.
    #[must_use]
    pub fn summary(&self) -> ExperimentSummary {
        let student_count = self.store.count_students().unwrap_or_else(|err| {
            warn!(experiment = %self.name, error = %err, "failed to count students");
            0
        });
        ExperimentSummary {
            name: self.name.to_string(),
            display_name: self.metadata.display_name_or(self.name.as_str()).to_string(),
            description: self.metadata.description.clone(),
            version: self.metadata.version.clone(),
            entry_point: self.metadata.entry_point.clone(),
            function_count: self.functions().len(),
            require_registration: self.metadata.require_registration,
            student_count,
        }
    }

    /// Reads the README split into frontmatter and body.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] when the README exists but cannot be read.
    pub fn readme(&self) -> Result<Option<ReadmeDocument>, RegistryError> {
        ReadmeDocument::read(&self.readme_path()).map_err(|err| RegistryError::Io {
            experiment: self.name.to_string(),
            message: err.to_string(),
        })
    }

    /// Executes an RPC call in this experiment.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError`] as described on [`execute`].
    pub fn call(&self, request: CallRequest) -> Result<Value, RpcError> {
        execute(self, request)
    }

    /// Registers a student after validating the id.
    ///
    /// # Errors
    ///
    /// Returns [`StudentError`] for malformed ids, duplicates, and storage
    /// failures.
    pub fn add_student(
        &self,
        student_id: &str,
        name: &str,
        email: Option<&str>,
    ) -> Result<Student, StudentError> {
        let id = StudentId::parse(student_id)
            .map_err(|_| StudentError::InvalidIdentity(student_id.to_string()))?;
        let student = Student::new(id, name, email.map(str::to_string));
        self.store.add_student(&student).map_err(|err| match err {
            StoreError::AlreadyExists(_) => StudentError::AlreadyExists(student_id.to_string()),
            other => StudentError::Storage(other),
        })
    }

    /// Lists registered students by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when storage fails.
    pub fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        self.store.list_students()
    }

    /// Deletes a student and its log history; false when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when storage fails.
    pub fn delete_student(&self, student_id: &str) -> Result<bool, StoreError> {
        self.store.delete_student(student_id)
    }

    /// Returns whether `student_id` is registered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when storage fails.
    pub fn is_registered(&self, student_id: &str) -> Result<bool, StoreError> {
        self.store.is_registered(student_id)
    }

    /// Returns one page of log entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when storage fails.
    pub fn query_logs(&self, query: &LogQuery) -> Result<Vec<CallLogEntry>, StoreError> {
        self.store.query_logs(query)
    }

    /// Returns log filter options.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when storage fails.
    pub fn log_options(&self) -> Result<LogOptions, StoreError> {
        self.store.log_options()
    }
}

// ============================================================================
// SECTION: Experiment Registry
// ============================================================================

/// All experiments discovered under one root, keyed by name.
#[derive(Debug, Default)]
pub struct ExperimentRegistry {
    /// Experiments root directory.
    root: PathBuf,
    /// Loaded experiments.
    experiments: BTreeMap<String, Arc<ExperimentContext>>,
}

impl ExperimentRegistry {
    /// Discovers experiments under `root`.
    ///
    /// A missing root yields an empty registry.
    #[must_use]
    pub fn discover(
        root: &Path,
        library: Arc<FunctionLibrary>,
        opener: &dyn StoreOpener,
    ) -> Self {
        let mut experiments = BTreeMap::new();
        for dir in experiment_dirs(root) {
            let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let Ok(name) = ExperimentName::parse(dir_name.as_str()) else {
                warn!(name = %dir_name, "skipping invalid experiment name");
                continue;
            };
            match ExperimentContext::load(name, &dir, Arc::clone(&library), opener) {
                Ok(context) => {
                    info!(
                        experiment = %dir_name,
                        functions = context.functions().len(),
                        "discovered experiment"
                    );
                    experiments.insert(dir_name, Arc::new(context));
                }
                Err(err) => warn!(experiment = %dir_name, error = %err, "failed to load experiment"),
            }
        }
        Self {
            root: root.to_path_buf(),
            experiments,
        }
    }

    /// Builds a registry from already loaded contexts.
    #[must_use]
    pub fn from_contexts(root: PathBuf, contexts: impl IntoIterator<Item = ExperimentContext>) -> Self {
        let experiments = contexts
            .into_iter()
            .map(|context| (context.name().to_string(), Arc::new(context)))
            .collect();
        Self {
            root,
            experiments,
        }
    }

    /// Returns the experiments root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves an experiment by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no such experiment is loaded.
    pub fn lookup(&self, name: &str) -> Result<Arc<ExperimentContext>, RegistryError> {
        self.experiments
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Reloads one experiment's functions; returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when no such experiment is loaded.
    pub fn reload_functions(&self, name: &str) -> Result<usize, RegistryError> {
        Ok(self.lookup(name)?.reload_functions())
    }

    /// Returns the loaded experiment names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.experiments.keys().map(String::as_str)
    }

    /// Returns the loaded experiments in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExperimentContext>> {
        self.experiments.values()
    }

    /// Returns the number of loaded experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Returns true when no experiment is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

/// Returns the immediate subdirectories of `root`, sorted by name.
fn experiment_dirs(root: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(root = %root.display(), error = %err, "experiments directory not readable");
            return Vec::new();
        }
    };
    let mut dirs: Vec<PathBuf> =
        entries.filter_map(Result::ok).map(|entry| entry.path()).filter(|path| path.is_dir()).collect();
    dirs.sort();
    dirs
}
