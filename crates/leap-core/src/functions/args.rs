// crates/leap-core/src/functions/args.rs
// ============================================================================
// Module: LEAP Call Arguments
// Description: Positional and keyword argument binding for RPC handlers.
// Purpose: Give handlers one lookup that honors both calling styles.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Callers supply positional `args` and keyword `kwargs`. Handlers bind each
//! parameter by index and name through [`Arguments::value`]; supplying a
//! parameter both ways, omitting a required one, or passing an unknown
//! keyword fails with a `TypeError` [`CallFailure`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Failure raised by a function handler, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct CallFailure {
    /// Failure kind, for example `TypeError` or `ValueError`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl CallFailure {
    /// Creates a failure with an explicit kind.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Argument binding or type mismatch.
    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    /// Argument has the right type but an unusable value.
    #[must_use]
    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new("ValueError", message)
    }

    /// Returns the tagged message stored in call logs (`Kind: message`).
    #[must_use]
    pub fn tagged(&self) -> String {
        self.to_string()
    }
}

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Arguments supplied to one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    /// Positional arguments in call order.
    positional: Vec<Value>,
    /// Keyword arguments.
    named: Map<String, Value>,
}

impl Arguments {
    /// Creates an argument set.
    #[must_use]
    pub const fn new(positional: Vec<Value>, named: Map<String, Value>) -> Self {
        Self {
            positional,
            named,
        }
    }

    /// Creates a positional-only argument set.
    #[must_use]
    pub fn positional_only(positional: Vec<Value>) -> Self {
        Self::new(positional, Map::new())
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Returns the keyword arguments.
    #[must_use]
    pub const fn named(&self) -> &Map<String, Value> {
        &self.named
    }

    /// Fails when more positional arguments than `params` were supplied or a
    /// keyword is not one of `params`.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` [`CallFailure`] describing the mismatch.
    pub fn expect_at_most(&self, params: &[&str]) -> Result<(), CallFailure> {
        if self.positional.len() > params.len() {
            return Err(CallFailure::type_error(format!(
                "takes {} positional argument(s) but {} were given",
                params.len(),
                self.positional.len()
            )));
        }
        if let Some(key) = self.named.keys().find(|key| !params.contains(&key.as_str())) {
            return Err(CallFailure::type_error(format!(
                "got an unexpected keyword argument '{key}'"
            )));
        }
        Ok(())
    }

    /// Binds parameter `name` at position `index`, if supplied.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when the parameter is given both ways.
    pub fn value_opt(&self, index: usize, name: &str) -> Result<Option<&Value>, CallFailure> {
        match (self.positional.get(index), self.named.get(name)) {
            (Some(_), Some(_)) => Err(CallFailure::type_error(format!(
                "got multiple values for argument '{name}'"
            ))),
            (Some(value), None) | (None, Some(value)) => Ok(Some(value)),
            (None, None) => Ok(None),
        }
    }

    /// Binds required parameter `name` at position `index`.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when the parameter is missing or given twice.
    pub fn value(&self, index: usize, name: &str) -> Result<&Value, CallFailure> {
        self.value_opt(index, name)?.ok_or_else(|| {
            CallFailure::type_error(format!("missing required argument: '{name}'"))
        })
    }

    /// Binds a required numeric parameter.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when missing or not a number.
    pub fn f64(&self, index: usize, name: &str) -> Result<f64, CallFailure> {
        as_f64(self.value(index, name)?, name)
    }

    /// Binds an optional numeric parameter with a default.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when given but not a number.
    pub fn f64_or(&self, index: usize, name: &str, default: f64) -> Result<f64, CallFailure> {
        self.value_opt(index, name)?.map_or(Ok(default), |value| as_f64(value, name))
    }

    /// Binds a required string parameter.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when missing or not a string.
    pub fn str(&self, index: usize, name: &str) -> Result<&str, CallFailure> {
        self.value(index, name)?
            .as_str()
            .ok_or_else(|| CallFailure::type_error(format!("argument '{name}' must be a string")))
    }
}

/// Reads a JSON number as `f64`.
fn as_f64(value: &Value, name: &str) -> Result<f64, CallFailure> {
    value
        .as_f64()
        .ok_or_else(|| CallFailure::type_error(format!("argument '{name}' must be a number")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
