// crates/leap-server/src/lib.rs
// ============================================================================
// Module: LEAP Server Library
// Description: HTTP API over the LEAP experiment registry.
// Purpose: Expose the router, admin policy, and server bootstrap.
// Dependencies: axum, leap-config, leap-core, tokio
// ============================================================================

//! ## Overview
//! `leap-server` serves discovered experiments over HTTP with axum. The
//! router can be driven directly in tests; [`LeapServer`] wires it to a TCP
//! listener from a [`leap_config::LeapConfig`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AdminAccess;
pub use auth::AdminAuth;
pub use auth::AuthError;
pub use error::ApiError;
pub use routes::AppState;
pub use routes::router;
pub use server::LeapServer;
pub use server::ServerError;
