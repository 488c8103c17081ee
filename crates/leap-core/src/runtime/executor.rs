// crates/leap-core/src/runtime/executor.rs
// ============================================================================
// Module: LEAP RPC Executor
// Description: Validated, gated, and logged function invocation.
// Purpose: Run one RPC call against an experiment context.
// Dependencies: crate::{core, experiment, functions, interfaces}, tracing
// ============================================================================

//! ## Overview
//! [`execute`] resolves the function, validates the caller identity, applies
//! registration gating, invokes the handler, and appends a log record unless
//! the function opts out. Validation and authorization failures are reported
//! before any user code runs. Log append failures never replace the call
//! outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use tracing::warn;

use crate::core::NewCallLog;
use crate::core::is_valid_student_id;
use crate::experiment::ExperimentContext;
use crate::functions::Arguments;
use crate::interfaces::CallLogStore;
use crate::interfaces::StoreError;
use crate::interfaces::StudentRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// RPC failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Function name is not loaded in the experiment.
    #[error("Unknown function: '{0}'")]
    UnknownFunction(String),
    /// Caller identity fails the format check.
    #[error("Invalid student_id: '{0}'")]
    InvalidIdentity(String),
    /// Registration is required and the caller is not registered.
    #[error("Student '{0}' is not registered")]
    NotRegistered(String),
    /// The handler failed; carries the tagged `Kind: message`.
    #[error("{0}")]
    ExecutionFailed(String),
    /// Registration lookup could not reach storage.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// One RPC invocation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRequest {
    /// Function to invoke.
    pub func_name: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Keyword arguments.
    pub kwargs: Map<String, Value>,
    /// Caller identity.
    pub student_id: String,
    /// Optional trial label.
    pub trial: Option<String>,
}

impl CallRequest {
    /// Creates a positional-only request.
    #[must_use]
    pub fn new(func_name: impl Into<String>, student_id: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            func_name: func_name.into(),
            args,
            kwargs: Map::new(),
            student_id: student_id.into(),
            trial: None,
        }
    }

    /// Sets the trial label.
    #[must_use]
    pub fn with_trial(mut self, trial: impl Into<String>) -> Self {
        self.trial = Some(trial.into());
        self
    }

    /// Sets the keyword arguments.
    #[must_use]
    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Executes one RPC call.
///
/// # Errors
///
/// Returns [`RpcError`] for unknown functions, malformed identities,
/// unregistered callers, handler failures, and registration lookups that
/// cannot reach storage.
pub fn execute(ctx: &ExperimentContext, request: CallRequest) -> Result<Value, RpcError> {
    let functions = ctx.functions();
    let Some(function) = functions.get(&request.func_name) else {
        return Err(RpcError::UnknownFunction(request.func_name));
    };

    if !is_valid_student_id(&request.student_id) {
        return Err(RpcError::InvalidIdentity(request.student_id));
    }

    let descriptor = function.descriptor();
    if !descriptor.skip_registration_check
        && ctx.require_registration()
        && !ctx.store().is_registered(&request.student_id)?
    {
        return Err(RpcError::NotRegistered(request.student_id));
    }

    let CallRequest {
        func_name,
        args,
        kwargs,
        student_id,
        trial,
    } = request;
    let arguments = Arguments::new(args, kwargs);
    let outcome = function.call(&arguments);
    if let Err(failure) = &outcome {
        warn!(
            experiment = %ctx.name(),
            function = %func_name,
            error = %failure,
            "rpc handler failed"
        );
    }

    if !descriptor.skip_logging {
        let record = NewCallLog {
            student_id,
            experiment: ctx.name().to_string(),
            func_name: func_name.clone(),
            args: arguments.positional().to_vec(),
            result: outcome.as_ref().ok().cloned(),
            error: outcome.as_ref().err().map(ToString::to_string),
            trial,
        };
        if let Err(err) = ctx.store().append_log(&record) {
            error!(
                experiment = %ctx.name(),
                function = %func_name,
                error = %err,
                "failed to log rpc call"
            );
        }
    }

    outcome.map_err(|failure| RpcError::ExecutionFailed(failure.tagged()))
}
