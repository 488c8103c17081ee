// crates/leap-cli/src/lib.rs
// ============================================================================
// Module: LEAP CLI Library
// Description: Offline administration helpers behind the `leap` binary.
// Purpose: Keep command logic testable apart from argument parsing.
// Dependencies: leap-config, leap-core, serde_json, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `leap` binary parses arguments and prints results; the work itself
//! lives here: opening and validating experiments, scaffolding new ones,
//! roster import, log export, and logging setup.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod csv_format;
pub mod error;
pub mod export;
pub mod logging;
pub mod project;
pub mod students;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ToolError;
pub use export::ExportFormat;
pub use export::export_logs;
pub use logging::init_tracing;
pub use project::CheckResult;
pub use project::CheckStatus;
pub use project::has_errors;
pub use project::list_experiments;
pub use project::open_experiment;
pub use project::scaffold_experiment;
pub use project::validate_experiment;
pub use students::ImportReport;
pub use students::import_students;
