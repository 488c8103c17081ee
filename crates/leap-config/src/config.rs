// crates/leap-config/src/config.rs
// ============================================================================
// Module: LEAP Configuration
// Description: Configuration loading and validation for LEAP.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: leap-core, leap-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the CLI flag, then `LEAP_CONFIG`, then `./leap.toml`;
//! only the implicit default may be absent, in which case built-in defaults
//! apply. `LEAP_ROOT` overrides the experiments root after parsing.
//! Invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use leap_core::is_valid_experiment_name;
use leap_store_sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use leap_store_sqlite::DEFAULT_DB_FILE;
use leap_store_sqlite::SqliteStoreMode;
use leap_store_sqlite::SqliteStoreOpener;
use leap_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "leap.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "LEAP_CONFIG";
/// Environment variable used to override the experiments root.
pub const ROOT_ENV_VAR: &str = "LEAP_ROOT";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of admin bearer tokens.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of an admin bearer token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Upper bound for `max_body_bytes`.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Upper bound for the `SQLite` busy timeout.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Maximum length of a log filter directive.
pub(crate) const MAX_LOG_LEVEL_LENGTH: usize = 256;
/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:9000";
/// Default experiments root.
pub const DEFAULT_EXPERIMENTS_ROOT: &str = "experiments";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// LEAP server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeapConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Experiment discovery configuration.
    #[serde(default)]
    pub experiments: ExperimentsConfig,
    /// Per-experiment storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the configuration was read from, when any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl LeapConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        let mut config = match resolved {
            ConfigSource::File(path) => Self::load_file(&path)?,
            ConfigSource::Default(path) if path.exists() => Self::load_file(&path)?,
            ConfigSource::Default(_) => Self::default(),
        };
        config.apply_root_override(env::var(ROOT_ENV_VAR).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates one configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or invalid.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the experiments root when `root` is set and non-blank.
    pub fn apply_root_override(&mut self, root: Option<String>) {
        if let Some(root) = root.filter(|value| !value.trim().is_empty()) {
            self.experiments.root = PathBuf::from(root);
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.experiments.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Builds the per-experiment store opener from `[storage]`.
    #[must_use]
    pub fn store_opener(&self) -> SqliteStoreOpener {
        SqliteStoreOpener {
            db_file: self.storage.db_file.clone(),
            busy_timeout_ms: self.storage.busy_timeout_ms,
            journal_mode: self.storage.journal_mode,
            sync_mode: self.storage.sync_mode,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Admin route authentication.
    #[serde(default)]
    pub auth: ServerAuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            auth: ServerAuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address is malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must be set".to_string()));
        }
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid("max_body_bytes exceeds limit".to_string()));
        }
        self.auth.validate()
    }
}

/// Admin route authentication.
///
/// With no tokens configured, admin routes are served to loopback peers only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerAuthConfig {
    /// Accepted bearer tokens.
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

impl ServerAuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bearer_tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid("too many auth tokens".to_string()));
        }
        for token in &self.bearer_tokens {
            if token.trim().is_empty() {
                return Err(ConfigError::Invalid("auth token must be non-empty".to_string()));
            }
            if token.len() > MAX_AUTH_TOKEN_LENGTH {
                return Err(ConfigError::Invalid("auth token too long".to_string()));
            }
            if token.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(
                    "auth token must not contain whitespace".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Experiment discovery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentsConfig {
    /// Directory holding one subdirectory per experiment.
    #[serde(default = "default_experiments_root")]
    pub root: PathBuf,
    /// Experiment expected at startup; its absence is logged as a warning.
    #[serde(default)]
    pub default_experiment: Option<String>,
}

impl Default for ExperimentsConfig {
    fn default() -> Self {
        Self {
            root: default_experiments_root(),
            default_experiment: None,
        }
    }
}

impl ExperimentsConfig {
    /// Validates experiment discovery configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("experiments.root", &self.root.to_string_lossy())?;
        if let Some(name) = &self.default_experiment
            && !is_valid_experiment_name(name)
        {
            return Err(ConfigError::Invalid(format!(
                "experiments.default_experiment is not a valid experiment name: {name}"
            )));
        }
        Ok(())
    }
}

/// Per-experiment storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Database path relative to each experiment directory.
    #[serde(default = "default_db_file")]
    pub db_file: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StorageConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("storage.db_file", &self.db_file.to_string_lossy())?;
        for component in self.db_file.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(ConfigError::Invalid(
                        "storage.db_file must stay inside the experiment directory".to_string(),
                    ));
                }
            }
        }
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid("storage.busy_timeout_ms too large".to_string()));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.trim();
        if level.is_empty() {
            return Err(ConfigError::Invalid("logging.level must be non-empty".to_string()));
        }
        if level.len() > MAX_LOG_LEVEL_LENGTH {
            return Err(ConfigError::Invalid("logging.level too long".to_string()));
        }
        if level.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "logging.level must not contain whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default experiments root.
fn default_experiments_root() -> PathBuf {
    PathBuf::from(DEFAULT_EXPERIMENTS_ROOT)
}

/// Default database file.
fn default_db_file() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

/// Default busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Default log level.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Where the configuration path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    /// Named explicitly; must exist.
    File(PathBuf),
    /// Implicit default; may be absent.
    Default(PathBuf),
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>, env_path: Option<String>) -> Result<ConfigSource, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigSource::File(path.to_path_buf()));
    }
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigSource::File(PathBuf::from(env_path)));
    }
    Ok(ConfigSource::Default(PathBuf::from(DEFAULT_CONFIG_NAME)))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
