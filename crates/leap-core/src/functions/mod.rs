// crates/leap-core/src/functions/mod.rs
// ============================================================================
// Module: LEAP Functions
// Description: Function library, argument binding, and manifest loading.
// Purpose: Turn compiled function modules into per-experiment RPC endpoints.
// Dependencies: serde, serde_json, toml, tracing
// ============================================================================

//! ## Overview
//! Experiment functions are native handlers registered in a
//! [`FunctionLibrary`]. An experiment's manifests choose which modules it
//! exposes; [`load_functions`] resolves them into a [`FunctionSet`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod args;
pub mod library;
pub mod loader;
pub mod set;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use args::Arguments;
pub use args::CallFailure;
pub use library::FunctionDef;
pub use library::FunctionHandler;
pub use library::FunctionLibrary;
pub use library::FunctionModule;
pub use loader::LoadError;
pub use loader::MANIFEST_EXTENSION;
pub use loader::load_functions;
pub use loader::load_manifest;
pub use loader::manifest_paths;
pub use set::FunctionDescriptor;
pub use set::FunctionInfo;
pub use set::FunctionSet;
pub use set::RegisteredFunction;
pub use set::UNKNOWN_SIGNATURE;
pub use set::get_function_info;
