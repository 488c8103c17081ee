// crates/leap-functions/src/lib.rs
// ============================================================================
// Module: LEAP Built-in Functions
// Description: Compiled function modules shipped with the server.
// Purpose: Provide the library experiment manifests select from.
// Dependencies: leap-core
// ============================================================================

//! ## Overview
//! This crate ships the built-in function modules (`math_funcs`,
//! `open_funcs`, `simulation`) and assembles them into a
//! [`leap_core::FunctionLibrary`]. Experiments opt in per module with a
//! `funcs/<module>.toml` manifest.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod math_funcs;
pub mod number;
pub mod open_funcs;
pub mod simulation;

// ============================================================================
// SECTION: Imports
// ============================================================================

use leap_core::FunctionLibrary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use number::Num;
pub use simulation::Position;
pub use simulation::SimulationState;

// ============================================================================
// SECTION: Library
// ============================================================================

/// Builds the built-in library with fresh simulation state.
#[must_use]
pub fn builtin_library() -> FunctionLibrary {
    builtin_library_with(&SimulationState::new())
}

/// Builds the built-in library sharing the given simulation state.
#[must_use]
pub fn builtin_library_with(state: &SimulationState) -> FunctionLibrary {
    FunctionLibrary::new()
        .with_module(math_funcs::module())
        .with_module(open_funcs::module())
        .with_module(simulation::module(state))
}
