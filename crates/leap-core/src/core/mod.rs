// crates/leap-core/src/core/mod.rs
// ============================================================================
// Module: LEAP Core Types
// Description: Canonical identifiers, student records, and call log types.
// Purpose: Provide stable, serializable types shared by stores and the API.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! LEAP core types define student identities, experiment names, call log
//! entries, and log query parameters. These types are the canonical source of
//! truth for derived surfaces (HTTP, CLI exports).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod log;
pub mod student;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::ExperimentName;
pub use identifiers::IdentifierError;
pub use identifiers::MAX_STUDENT_ID_LENGTH;
pub use identifiers::StudentId;
pub use identifiers::is_valid_experiment_name;
pub use identifiers::is_valid_student_id;
pub use log::CallLogEntry;
pub use log::DEFAULT_LOG_LIMIT;
pub use log::LogOptions;
pub use log::LogOrder;
pub use log::LogQuery;
pub use log::MAX_LOG_LIMIT;
pub use log::MIN_LOG_LIMIT;
pub use log::NewCallLog;
pub use log::clamp_limit;
pub use log::decode_payload;
pub use student::Student;
pub use time::Timestamp;
pub use time::TimestampError;
