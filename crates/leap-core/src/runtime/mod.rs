// crates/leap-core/src/runtime/mod.rs
// ============================================================================
// Module: LEAP Runtime
// Description: RPC execution and store helpers.
// Purpose: Execute experiment functions against pluggable storage.
// Dependencies: crate::{core, experiment, functions, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement RPC execution plus the shared and in-memory
//! store wrappers. Every external surface (HTTP, CLI) calls into the same
//! executor so gating and logging behave identically.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod executor;
pub mod memory;
pub mod shared;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use executor::CallRequest;
pub use executor::RpcError;
pub use executor::execute;
pub use memory::InMemoryExperimentStore;
pub use memory::InMemoryStoreOpener;
pub use shared::SharedExperimentStore;
