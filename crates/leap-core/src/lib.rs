// crates/leap-core/src/lib.rs
// ============================================================================
// Module: LEAP Core Library
// Description: Public API surface for the LEAP experiment core.
// Purpose: Expose core types, storage interfaces, function loading, and RPC.
// Dependencies: crate::{core, interfaces, functions, experiment, runtime}
// ============================================================================

//! ## Overview
//! LEAP core hosts per-experiment function endpoints. It discovers experiment
//! directories, loads each experiment's functions from a compiled function
//! library, gates calls on student registration, and records every call in an
//! append-only log with cursor pagination. Storage is reached through the
//! [`ExperimentStore`] interface so backends stay pluggable.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod experiment;
pub mod functions;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use experiment::DEFAULT_ENTRY_POINT;
pub use experiment::ExperimentContext;
pub use experiment::ExperimentMetadata;
pub use experiment::ExperimentRegistry;
pub use experiment::ExperimentSummary;
pub use experiment::FUNCS_DIR;
pub use experiment::README_FILE;
pub use experiment::ReadmeDocument;
pub use experiment::RegistryError;
pub use experiment::StudentError;
pub use experiment::UI_DIR;
pub use functions::Arguments;
pub use functions::CallFailure;
pub use functions::FunctionDef;
pub use functions::FunctionDescriptor;
pub use functions::FunctionHandler;
pub use functions::FunctionInfo;
pub use functions::FunctionLibrary;
pub use functions::FunctionModule;
pub use functions::FunctionSet;
pub use functions::LoadError;
pub use functions::MANIFEST_EXTENSION;
pub use functions::RegisteredFunction;
pub use functions::UNKNOWN_SIGNATURE;
pub use functions::get_function_info;
pub use functions::load_functions;
pub use functions::load_manifest;
pub use functions::manifest_paths;
pub use interfaces::CallLogStore;
pub use interfaces::ExperimentStore;
pub use interfaces::StoreError;
pub use interfaces::StoreOpener;
pub use interfaces::StudentRegistry;
pub use runtime::CallRequest;
pub use runtime::InMemoryExperimentStore;
pub use runtime::InMemoryStoreOpener;
pub use runtime::RpcError;
pub use runtime::SharedExperimentStore;
pub use runtime::execute;
