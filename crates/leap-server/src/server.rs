// crates/leap-server/src/server.rs
// ============================================================================
// Module: LEAP Server
// Description: Server bootstrap from configuration and the HTTP serve loop.
// Purpose: Discover experiments once and serve them until shutdown.
// Dependencies: axum, leap-config, leap-core, tokio, tracing
// ============================================================================

//! ## Overview
//! [`LeapServer::from_config`] validates the configuration, discovers every
//! experiment under the configured root with the SQLite store opener, and
//! prepares the router. [`LeapServer::serve`] binds the listener with peer
//! addresses attached so loopback-only admin routes can see the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use leap_config::LeapConfig;
use leap_core::ExperimentRegistry;
use leap_core::FunctionLibrary;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::auth::AdminAuth;
use crate::routes::AppState;
use crate::routes::router;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Configured LEAP HTTP server.
#[derive(Debug)]
pub struct LeapServer {
    /// Listen address.
    bind: SocketAddr,
    /// Shared handler state.
    state: AppState,
    /// Request body limit.
    max_body_bytes: usize,
}

impl LeapServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when validation fails.
    pub fn from_config(
        config: &LeapConfig,
        library: Arc<FunctionLibrary>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let root = &config.experiments.root;
        if !root.is_dir() {
            warn!(root = %root.display(), "experiments root is not a directory");
        }
        let registry = ExperimentRegistry::discover(root, library, &config.store_opener());
        if let Some(default) = config.experiments.default_experiment.as_deref()
            && registry.lookup(default).is_err()
        {
            warn!(experiment = default, "default experiment was not discovered");
        }
        let auth = AdminAuth::from_config(&config.server.auth);
        Ok(Self {
            bind,
            state: AppState::new(registry, auth),
            max_body_bytes: config.server.max_body_bytes,
        })
    }

    /// Returns the loaded experiment registry.
    #[must_use]
    pub fn registry(&self) -> &ExperimentRegistry {
        &self.state.registry
    }

    /// Returns the configured listen address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the HTTP router without binding a listener.
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone(), self.max_body_bytes)
    }

    /// Serves HTTP until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        info!(
            bind = %self.bind,
            experiments = self.state.registry.len(),
            auth = if self.state.auth.requires_token() { "bearer" } else { "loopback" },
            "leap server listening"
        );
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server bootstrap and transport errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
