// crates/leap-core/src/functions/loader.rs
// ============================================================================
// Module: LEAP Function Loader
// Description: Manifest-driven discovery of an experiment's functions.
// Purpose: Build a function set from `funcs/*.toml` manifests.
// Dependencies: serde, toml, tracing
// ============================================================================

//! ## Overview
//! Each `*.toml` file directly inside an experiment's `funcs/` directory
//! selects one [`FunctionModule`](crate::FunctionModule) of the compiled
//! library. Files are processed in lexicographic order. A manifest that fails
//! to load is skipped with a warning and never aborts the others; a name
//! produced by a later manifest replaces the earlier one.
//!
//! ```toml
//! # funcs/math_funcs.toml (module defaults to the file stem)
//! module = "math_funcs"
//! include = ["square", "add"]
//! exclude = []
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::functions::library::FunctionLibrary;
use crate::functions::set::FunctionSet;
use crate::functions::set::RegisteredFunction;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File extension of function manifests.
pub const MANIFEST_EXTENSION: &str = "toml";
/// Maximum manifest size in bytes.
pub const MAX_MANIFEST_SIZE: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Per-manifest load failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Manifest could not be read.
    #[error("{path}: io error: {message}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// Manifest is not valid UTF-8 TOML of the expected shape.
    #[error("{path}: parse error: {message}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// Manifest names a module the library does not provide.
    #[error("{path}: unknown function module '{module}'")]
    UnknownModule {
        /// Manifest path.
        path: PathBuf,
        /// Requested module name.
        module: String,
    },
    /// Manifest includes or excludes a function the module does not define.
    #[error("{path}: module '{module}' has no function '{function}'")]
    UnknownFunction {
        /// Manifest path.
        path: PathBuf,
        /// Module name.
        module: String,
        /// Requested function name.
        function: String,
    },
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Parsed manifest contents.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionManifest {
    /// Module override; defaults to the file stem.
    #[serde(default)]
    module: Option<String>,
    /// Allow-list of exported functions.
    #[serde(default)]
    include: Option<Vec<String>>,
    /// Deny-list of exported functions.
    #[serde(default)]
    exclude: Vec<String>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads every manifest in `dir` against `library`.
///
/// A missing directory yields an empty set.
#[must_use]
pub fn load_functions(dir: &Path, library: &FunctionLibrary) -> FunctionSet {
    let mut set = FunctionSet::new();
    for path in manifest_paths(dir) {
        let functions = match load_manifest(&path, library) {
            Ok(functions) => functions,
            Err(err) => {
                warn!(manifest = %path.display(), error = %err, "skipping function manifest");
                continue;
            }
        };
        for function in functions {
            let name = function.name().to_string();
            let module = function.module().to_string();
            if let Some(previous) = set.insert(function) {
                warn!(
                    function = %name,
                    previous_module = %previous.module(),
                    module = %module,
                    manifest = %path.display(),
                    "duplicate function name; later manifest wins"
                );
            }
        }
    }
    debug!(dir = %dir.display(), count = set.len(), "loaded experiment functions");
    set
}

/// Loads one manifest, returning the functions it exports in module order.
///
/// # Errors
///
/// Returns [`LoadError`] when the manifest cannot be read, parsed, or
/// resolved against `library`.
pub fn load_manifest(
    path: &Path,
    library: &FunctionLibrary,
) -> Result<Vec<RegisteredFunction>, LoadError> {
    let manifest = read_manifest(path)?;
    let module_name = match manifest.module {
        Some(name) => name,
        None => file_stem(path),
    };
    let Some(module) = library.module(&module_name) else {
        return Err(LoadError::UnknownModule {
            path: path.to_path_buf(),
            module: module_name,
        });
    };
    let listed = manifest.include.iter().flatten().chain(manifest.exclude.iter());
    for name in listed {
        if module.get(name).is_none() {
            return Err(LoadError::UnknownFunction {
                path: path.to_path_buf(),
                module: module_name.clone(),
                function: name.clone(),
            });
        }
    }
    let exported = module
        .functions()
        .iter()
        .filter(|function| !function.name().starts_with('_'))
        .filter(|function| {
            manifest
                .include
                .as_ref()
                .is_none_or(|include| include.iter().any(|name| name == function.name()))
        })
        .filter(|function| !manifest.exclude.iter().any(|name| name == function.name()))
        .map(|function| RegisteredFunction::from_def(module.name(), function))
        .collect();
    Ok(exported)
}

/// Returns the manifest files directly inside `dir`, sorted by file name.
#[must_use]
pub fn manifest_paths(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == MANIFEST_EXTENSION))
        .collect();
    paths.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    paths
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads and parses a manifest with size and encoding checks.
fn read_manifest(path: &Path) -> Result<FunctionManifest, LoadError> {
    let bytes = fs::read(path).map_err(|err| LoadError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if bytes.len() > MAX_MANIFEST_SIZE {
        return Err(LoadError::Parse {
            path: path.to_path_buf(),
            message: "manifest exceeds size limit".to_string(),
        });
    }
    let content = std::str::from_utf8(&bytes).map_err(|_| LoadError::Parse {
        path: path.to_path_buf(),
        message: "manifest must be utf-8".to_string(),
    })?;
    toml::from_str(content).map_err(|err| LoadError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Returns the file stem as a module name.
fn file_stem(path: &Path) -> String {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}
