// crates/leap-config/src/lib.rs
// ============================================================================
// Module: LEAP Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for leap.toml semantics.
// Dependencies: leap-core, leap-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `leap-config` defines the configuration model shared by the server and the
//! CLI. Loading is strict and fail-closed; see [`LeapConfig::load`] for the
//! path resolution order.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
