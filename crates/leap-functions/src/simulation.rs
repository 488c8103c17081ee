// crates/leap-functions/src/simulation.rs
// ============================================================================
// Module: Simulation Functions
// Description: Per-student agent positions driven by high-frequency calls.
// Purpose: Demonstrate unlogged polling next to logged state changes.
// Dependencies: leap-core, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Each student owns one agent position keyed by the `student_id` argument.
//! `step` and `get_position` are polled by dashboards and skip logging;
//! `reset` is rare and logged. Positions live in a [`SimulationState`] owned
//! by the module so separate libraries never share agents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use leap_core::Arguments;
use leap_core::CallFailure;
use leap_core::FunctionDef;
use leap_core::FunctionModule;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

// ============================================================================
// SECTION: State
// ============================================================================

/// Module name used by `funcs/simulation.toml`.
pub const MODULE_NAME: &str = "simulation";

/// Agent position on the plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Shared position table.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    /// Positions keyed by student id.
    positions: Arc<Mutex<BTreeMap<String, Position>>>,
}

impl SimulationState {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored position for `student_id`, or the origin.
    ///
    /// # Errors
    ///
    /// Returns a `RuntimeError` when the table lock is poisoned.
    pub fn position(&self, student_id: &str) -> Result<Position, CallFailure> {
        Ok(self.lock()?.get(student_id).copied().unwrap_or_default())
    }

    /// Moves the agent and returns the new position.
    ///
    /// # Errors
    ///
    /// Returns a `RuntimeError` when the table lock is poisoned.
    pub fn step(&self, student_id: &str, dx: f64, dy: f64) -> Result<Position, CallFailure> {
        let mut positions = self.lock()?;
        let position = positions.entry(student_id.to_string()).or_default();
        position.x += dx;
        position.y += dy;
        Ok(*position)
    }

    /// Moves the agent back to the origin.
    ///
    /// # Errors
    ///
    /// Returns a `RuntimeError` when the table lock is poisoned.
    pub fn reset(&self, student_id: &str) -> Result<Position, CallFailure> {
        let origin = Position::default();
        self.lock()?.insert(student_id.to_string(), origin);
        debug!(student_id, "simulation agent reset");
        Ok(origin)
    }

    /// Acquires the table lock.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Position>>, CallFailure> {
        self.positions
            .lock()
            .map_err(|_| CallFailure::new("RuntimeError", "simulation state unavailable"))
    }
}

// ============================================================================
// SECTION: Module
// ============================================================================

/// Builds the `simulation` module over `state`.
#[must_use]
pub fn module(state: &SimulationState) -> FunctionModule {
    let step_state = state.clone();
    let position_state = state.clone();
    let reset_state = state.clone();
    FunctionModule::new(MODULE_NAME)
        .with(
            FunctionDef::new("step", move |args| {
                args.expect_at_most(&["student_id", "dx", "dy"])?;
                let student_id = args.str(0, "student_id")?;
                let dx = args.f64_or(1, "dx", 0.0)?;
                let dy = args.f64_or(2, "dy", 0.0)?;
                position_value(step_state.step(student_id, dx, dy)?)
            })
            .signature("(student_id: str, dx: float = 0.0, dy: float = 0.0) -> dict")
            .doc("Move the agent by (dx, dy). Called at high frequency, not logged.")
            .nolog(),
        )
        .with(
            FunctionDef::new("get_position", move |args| {
                args.expect_at_most(&["student_id"])?;
                position_value(position_state.position(args.str(0, "student_id")?)?)
            })
            .signature("(student_id: str) -> dict")
            .doc("Return the current agent position. Polled frequently, not logged.")
            .nolog(),
        )
        .with(
            FunctionDef::new("reset", move |args: &Arguments| {
                args.expect_at_most(&["student_id"])?;
                position_value(reset_state.reset(args.str(0, "student_id")?)?)
            })
            .signature("(student_id: str) -> dict")
            .doc("Reset the agent to the origin. Infrequent, logged."),
        )
}

/// Renders a position as a JSON object.
fn position_value(position: Position) -> Result<Value, CallFailure> {
    serde_json::to_value(position).map_err(|err| CallFailure::new("RuntimeError", err.to_string()))
}
