// crates/leap-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic starter file for `leap config example`.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The example spells out every key with its default value.

/// Returns a canonical example `leap.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:9000"
max_body_bytes = 1048576

[server.auth]
# Admin routes accept these bearer tokens. With none, only loopback peers
# may call admin routes.
bearer_tokens = []

[experiments]
root = "experiments"
# default_experiment = "default"

[storage]
db_file = "db/experiment.db"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"

[logging]
level = "info"
format = "text"
"#,
    )
}
