// crates/leap-cli/src/logging.rs
// ============================================================================
// Module: Logging Setup
// Description: Installs the process-wide tracing subscriber.
// Purpose: Route library `tracing` events to stderr as text or JSON.
// Dependencies: leap-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` wins over the configured level when set. Output always goes to
//! stderr so command output on stdout stays machine-readable.

use leap_config::LogFormat;
use tracing_subscriber::EnvFilter;

use crate::error::ToolError;

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`ToolError::Invalid`] when `level` is not a valid filter or a
/// subscriber is already installed.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), ToolError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|err| ToolError::Invalid(format!("invalid log level '{level}': {err}")))?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| ToolError::Invalid(format!("failed to install logger: {err}")))
}
