// crates/leap-core/src/experiment/mod.rs
// ============================================================================
// Module: LEAP Experiments
// Description: Experiment metadata, discovery, and runtime contexts.
// Purpose: Resolve experiment names to isolated functions and storage.
// Dependencies: crate::{core, functions, interfaces, runtime}
// ============================================================================

//! ## Overview
//! An experiment is a directory under the experiments root containing a
//! `README.md` with optional frontmatter, a `funcs/` manifest directory, and
//! a `db/` directory owned by its store. Experiments share no state.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod metadata;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use metadata::DEFAULT_ENTRY_POINT;
pub use metadata::ExperimentMetadata;
pub use metadata::ReadmeDocument;
pub use metadata::parse_frontmatter;
pub use metadata::split_frontmatter;
pub use registry::ExperimentContext;
pub use registry::ExperimentRegistry;
pub use registry::ExperimentSummary;
pub use registry::FUNCS_DIR;
pub use registry::README_FILE;
pub use registry::RegistryError;
pub use registry::StudentError;
pub use registry::UI_DIR;
