// crates/leap-server/src/auth.rs
// ============================================================================
// Module: LEAP Admin Authentication
// Description: Bearer-token and loopback policies for admin routes.
// Purpose: Gate student administration and function reloads.
// Dependencies: axum, leap-config, thiserror
// ============================================================================

//! ## Overview
//! Admin routes are guarded by [`AdminAuth`]. When bearer tokens are
//! configured a request must present one of them; when none are configured
//! only loopback peers are admitted. The [`AdminAccess`] extractor applies
//! the policy before a handler runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use leap_config::ServerAuthConfig;
use thiserror::Error;
use tracing::warn;

use crate::error::ApiError;
use crate::routes::AppState;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header size.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Admin authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Caller is not authenticated.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Admin route policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAuth {
    /// Accepted bearer tokens; empty means loopback only.
    bearer_tokens: BTreeSet<String>,
}

impl AdminAuth {
    /// Builds the policy from `[server.auth]`.
    #[must_use]
    pub fn from_config(config: &ServerAuthConfig) -> Self {
        Self {
            bearer_tokens: config.bearer_tokens.iter().cloned().collect(),
        }
    }

    /// Builds a loopback-only policy.
    #[must_use]
    pub fn local_only() -> Self {
        Self::default()
    }

    /// Returns true when bearer tokens are required.
    #[must_use]
    pub fn requires_token(&self) -> bool {
        !self.bearer_tokens.is_empty()
    }

    /// Authorizes one admin request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when the token is missing or
    /// unknown, or when a loopback-only policy sees a remote or unknown peer.
    pub fn authorize(
        &self,
        peer: Option<SocketAddr>,
        auth_header: Option<&str>,
    ) -> Result<(), AuthError> {
        if self.requires_token() {
            let token = parse_bearer_token(auth_header)?;
            if !self.bearer_tokens.contains(token) {
                return Err(AuthError::Unauthenticated("invalid bearer token".to_string()));
            }
            return Ok(());
        }
        match peer {
            Some(addr) if addr.ip().is_loopback() => Ok(()),
            _ => Err(AuthError::Unauthenticated(
                "admin routes require loopback access".to_string(),
            )),
        }
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
fn parse_bearer_token(auth_header: Option<&str>) -> Result<&str, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token)
}

// ============================================================================
// SECTION: Extractor
// ============================================================================

/// Proof that the request passed the admin policy.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0);
        let header = parts.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
        state.auth.authorize(peer, header).map_err(|err| {
            warn!(path = parts.uri.path(), error = %err, "admin request rejected");
            ApiError::from(err)
        })?;
        Ok(Self)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    fn peer(ip: Ipv4Addr) -> Option<SocketAddr> {
        Some(SocketAddr::from((ip, 40_000)))
    }

    fn with_tokens(tokens: &[&str]) -> AdminAuth {
        AdminAuth::from_config(&ServerAuthConfig {
            bearer_tokens: tokens.iter().map(ToString::to_string).collect(),
        })
    }

    #[test]
    fn local_only_admits_loopback_peers() {
        let auth = AdminAuth::local_only();
        assert!(auth.authorize(peer(Ipv4Addr::LOCALHOST), None).is_ok());
        assert!(auth.authorize(peer(Ipv4Addr::new(10, 0, 0, 7)), None).is_err());
        assert!(auth.authorize(None, None).is_err());
    }

    #[test]
    fn tokens_are_required_from_any_peer() {
        let auth = with_tokens(&["s3cret"]);
        assert_eq!(
            auth.authorize(peer(Ipv4Addr::LOCALHOST), None),
            Err(AuthError::Unauthenticated("missing authorization".to_string()))
        );
        assert!(auth.authorize(peer(Ipv4Addr::new(10, 0, 0, 7)), Some("Bearer s3cret")).is_ok());
        assert!(auth.authorize(None, Some("bearer s3cret")).is_ok());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let auth = with_tokens(&["s3cret"]);
        for header in ["Basic s3cret", "Bearer", "Bearer   ", "s3cret"] {
            assert_eq!(
                auth.authorize(None, Some(header)),
                Err(AuthError::Unauthenticated("invalid authorization header".to_string()))
            );
        }
        assert_eq!(
            auth.authorize(None, Some("Bearer other")),
            Err(AuthError::Unauthenticated("invalid bearer token".to_string()))
        );
    }
}
