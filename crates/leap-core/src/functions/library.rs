// crates/leap-core/src/functions/library.rs
// ============================================================================
// Module: LEAP Function Library
// Description: Compiled registration table of experiment function modules.
// Purpose: Replace runtime source loading with explicit, typed registration.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`FunctionLibrary`] is built once at startup from named
//! [`FunctionModule`]s. Each module lists [`FunctionDef`]s created with a
//! builder that carries the signature, doc text, and the two opt-out markers.
//! Experiments select modules through manifests in their `funcs/` directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::functions::args::Arguments;
use crate::functions::args::CallFailure;

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Shared function handler.
pub type FunctionHandler = Arc<dyn Fn(&Arguments) -> Result<Value, CallFailure> + Send + Sync>;

// ============================================================================
// SECTION: Function Definitions
// ============================================================================

/// One registrable function with its metadata.
#[derive(Clone)]
pub struct FunctionDef {
    /// Invocation name.
    name: String,
    /// Author-supplied parameter list.
    signature: Option<String>,
    /// Documentation text.
    doc: String,
    /// Skip call logging.
    nolog: bool,
    /// Skip the registration check.
    noregcheck: bool,
    /// Callable body.
    handler: FunctionHandler,
}

impl FunctionDef {
    /// Creates a definition with default markers (logged, registration checked).
    #[must_use]
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, CallFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: None,
            doc: String::new(),
            nolog: false,
            noregcheck: false,
            handler: Arc::new(handler),
        }
    }

    /// Sets the human-readable parameter list, e.g. `(x: float) -> float`.
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Sets the documentation text.
    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Marks the function as never logged.
    #[must_use]
    pub const fn nolog(mut self) -> Self {
        self.nolog = true;
        self
    }

    /// Marks the function as callable without registration.
    #[must_use]
    pub const fn noregcheck(mut self) -> Self {
        self.noregcheck = true;
        self
    }

    /// Returns the invocation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the signature, when the author gave one.
    #[must_use]
    pub fn signature_text(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Returns the documentation text.
    #[must_use]
    pub fn doc_text(&self) -> &str {
        &self.doc
    }

    /// Returns true when the function skips logging.
    #[must_use]
    pub const fn is_nolog(&self) -> bool {
        self.nolog
    }

    /// Returns true when the function skips the registration check.
    #[must_use]
    pub const fn is_noregcheck(&self) -> bool {
        self.noregcheck
    }

    /// Returns a shared handle to the handler.
    #[must_use]
    pub fn handler(&self) -> FunctionHandler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("nolog", &self.nolog)
            .field("noregcheck", &self.noregcheck)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Named group of functions selected together by a manifest.
#[derive(Debug, Clone)]
pub struct FunctionModule {
    /// Module name referenced by manifests.
    name: String,
    /// Functions in declaration order.
    functions: Vec<FunctionDef>,
}

impl FunctionModule {
    /// Creates an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    /// Adds a function, builder style.
    #[must_use]
    pub fn with(mut self, function: FunctionDef) -> Self {
        self.functions.push(function);
        self
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the functions in declaration order.
    #[must_use]
    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|function| function.name == name)
    }
}

// ============================================================================
// SECTION: Library
// ============================================================================

/// Registration table of every module available to experiments.
#[derive(Debug, Clone, Default)]
pub struct FunctionLibrary {
    /// Modules keyed by name.
    modules: BTreeMap<String, FunctionModule>,
}

impl FunctionLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module, builder style. A module with the same name is replaced.
    #[must_use]
    pub fn with_module(mut self, module: FunctionModule) -> Self {
        self.insert(module);
        self
    }

    /// Adds a module, returning the module it replaced.
    pub fn insert(&mut self, module: FunctionModule) -> Option<FunctionModule> {
        self.modules.insert(module.name.clone(), module)
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&FunctionModule> {
        self.modules.get(name)
    }

    /// Returns all modules in name order.
    pub fn modules(&self) -> impl Iterator<Item = &FunctionModule> {
        self.modules.values()
    }
}
