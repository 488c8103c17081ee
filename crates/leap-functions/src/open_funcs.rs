// crates/leap-functions/src/open_funcs.rs
// ============================================================================
// Module: Open Functions
// Description: Utility functions callable without registration.
// Purpose: Connectivity checks for students before they are enrolled.
// Dependencies: leap-core, serde_json
// ============================================================================

//! ## Overview
//! All functions here skip the registration check but are still logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use leap_core::Arguments;
use leap_core::CallFailure;
use leap_core::FunctionDef;
use leap_core::FunctionModule;
use leap_core::Timestamp;
use serde_json::Value;

// ============================================================================
// SECTION: Module
// ============================================================================

/// Module name used by `funcs/open_funcs.toml`.
pub const MODULE_NAME: &str = "open_funcs";

/// Builds the `open_funcs` module.
#[must_use]
pub fn module() -> FunctionModule {
    FunctionModule::new(MODULE_NAME)
        .with(
            FunctionDef::new("echo", echo)
                .signature("(x)")
                .doc("Return input unchanged. Open to all, still logged.")
                .noregcheck(),
        )
        .with(
            FunctionDef::new("ping", ping)
                .signature("() -> str")
                .doc("Health check callable by anyone. Still logged.")
                .noregcheck(),
        )
        .with(
            FunctionDef::new("server_time", server_time)
                .signature("() -> str")
                .doc("Return current server UTC time. Open to all.")
                .noregcheck(),
        )
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Returns `x` unchanged.
fn echo(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&["x"])?;
    Ok(args.value(0, "x")?.clone())
}

/// Returns `"pong"`.
fn ping(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&[])?;
    Ok(Value::from("pong"))
}

/// Returns the current UTC time as RFC 3339 text.
fn server_time(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&[])?;
    let now = Timestamp::now()
        .to_iso8601()
        .map_err(|err| CallFailure::new("RuntimeError", err.to_string()))?;
    Ok(Value::from(now))
}
