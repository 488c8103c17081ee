// crates/leap-core/src/functions/set.rs
// ============================================================================
// Module: LEAP Function Set
// Description: Loaded function descriptors for one experiment.
// Purpose: Resolve invocation names to handlers and expose their metadata.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`FunctionSet`] is the complete function mapping of one experiment. It
//! is built wholesale by the loader and swapped as a unit on reload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::functions::args::Arguments;
use crate::functions::args::CallFailure;
use crate::functions::library::FunctionDef;
use crate::functions::library::FunctionHandler;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Signature reported when the author gave none.
pub const UNKNOWN_SIGNATURE: &str = "(...)";

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Metadata of one loaded function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Invocation name.
    pub name: String,
    /// Human-readable parameter list.
    pub signature: String,
    /// Documentation text, possibly empty.
    pub doc: String,
    /// Calls are never logged.
    pub skip_logging: bool,
    /// Calls do not require registration.
    pub skip_registration_check: bool,
}

/// Wire form of a descriptor, keyed by name in `describe_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Human-readable parameter list.
    pub signature: String,
    /// Documentation text.
    pub doc: String,
    /// Skip-logging marker.
    pub nolog: bool,
    /// Skip-registration-check marker.
    pub noregcheck: bool,
}

impl From<&FunctionDescriptor> for FunctionInfo {
    fn from(descriptor: &FunctionDescriptor) -> Self {
        Self {
            signature: descriptor.signature.clone(),
            doc: descriptor.doc.clone(),
            nolog: descriptor.skip_logging,
            noregcheck: descriptor.skip_registration_check,
        }
    }
}

/// Derives the descriptor of a function definition.
#[must_use]
pub fn get_function_info(function: &FunctionDef) -> FunctionDescriptor {
    FunctionDescriptor {
        name: function.name().to_string(),
        signature: function.signature_text().unwrap_or(UNKNOWN_SIGNATURE).to_string(),
        doc: function.doc_text().trim().to_string(),
        skip_logging: function.is_nolog(),
        skip_registration_check: function.is_noregcheck(),
    }
}

// ============================================================================
// SECTION: Registered Functions
// ============================================================================

/// Loaded function: descriptor, origin, and handler.
#[derive(Clone)]
pub struct RegisteredFunction {
    /// Function metadata.
    descriptor: FunctionDescriptor,
    /// Library module the function came from.
    module: String,
    /// Callable body.
    handler: FunctionHandler,
}

impl RegisteredFunction {
    /// Wraps a library definition loaded from `module`.
    #[must_use]
    pub fn from_def(module: impl Into<String>, function: &FunctionDef) -> Self {
        Self {
            descriptor: get_function_info(function),
            module: module.into(),
            handler: function.handler(),
        }
    }

    /// Returns the descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Returns the invocation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Returns the originating module name.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Invokes the handler.
    ///
    /// # Errors
    ///
    /// Returns the handler's [`CallFailure`].
    pub fn call(&self, args: &Arguments) -> Result<Value, CallFailure> {
        (self.handler)(args)
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("descriptor", &self.descriptor)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Function Set
// ============================================================================

/// Function mapping of one experiment.
#[derive(Debug, Clone, Default)]
pub struct FunctionSet {
    /// Functions keyed by invocation name.
    functions: BTreeMap<String, RegisteredFunction>,
}

impl FunctionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a function, returning the one it replaced.
    pub fn insert(&mut self, function: RegisteredFunction) -> Option<RegisteredFunction> {
        self.functions.insert(function.name().to_string(), function)
    }

    /// Resolves a function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    /// Returns true when `name` is loaded.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns the number of loaded functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true when no function is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Returns the loaded names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Returns the wire metadata of every function keyed by name.
    #[must_use]
    pub fn describe_all(&self) -> BTreeMap<String, FunctionInfo> {
        self.functions
            .iter()
            .map(|(name, function)| (name.clone(), FunctionInfo::from(function.descriptor())))
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
