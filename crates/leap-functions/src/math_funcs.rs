// crates/leap-functions/src/math_funcs.rs
// ============================================================================
// Module: Math Functions
// Description: Numeric exercise functions for optimization labs.
// Purpose: Logged, registration-gated building blocks for student scripts.
// Dependencies: leap-core, serde_json
// ============================================================================

//! ## Overview
//! Every function here is logged and requires registration. Results keep
//! integer type when all inputs are integers, except where the operation
//! divides or scales by a float.

// ============================================================================
// SECTION: Imports
// ============================================================================

use leap_core::Arguments;
use leap_core::CallFailure;
use leap_core::FunctionDef;
use leap_core::FunctionModule;
use serde_json::Value;

use crate::number::Num;

// ============================================================================
// SECTION: Module
// ============================================================================

/// Module name used by `funcs/math_funcs.toml`.
pub const MODULE_NAME: &str = "math_funcs";

/// Builds the `math_funcs` module.
#[must_use]
pub fn module() -> FunctionModule {
    FunctionModule::new(MODULE_NAME)
        .with(
            FunctionDef::new("square", square)
                .signature("(x: float) -> float")
                .doc("Return x squared."),
        )
        .with(
            FunctionDef::new("cubic", cubic)
                .signature("(x: float) -> float")
                .doc("Return x cubed."),
        )
        .with(
            FunctionDef::new("add", add)
                .signature("(a: float, b: float) -> float")
                .doc("Return a + b."),
        )
        .with(
            FunctionDef::new("rosenbrock", rosenbrock)
                .signature("(x: float, y: float) -> float")
                .doc("Evaluate the Rosenbrock function: (1-x)^2 + 100*(y-x^2)^2."),
        )
        .with(
            FunctionDef::new("bisect", bisect)
                .signature("(f_left: float, f_right: float, target: float = 0.0) -> float")
                .doc("Return the midpoint of an interval, one step of the bisection method."),
        )
        .with(
            FunctionDef::new("gradient_step", gradient_step)
                .signature("(x: float, grad: float, lr: float = 0.01) -> float")
                .doc("One gradient descent step: x - lr * grad."),
        )
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Returns `x * x`.
fn square(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&["x"])?;
    Ok(Num::arg(args, 0, "x")?.squared().into())
}

/// Returns `x * x * x`.
fn cubic(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&["x"])?;
    let x = Num::arg(args, 0, "x")?;
    Ok((x.squared() * x).into())
}

/// Returns `a + b`.
fn add(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&["a", "b"])?;
    Ok((Num::arg(args, 0, "a")? + Num::arg(args, 1, "b")?).into())
}

/// Evaluates the Rosenbrock function at `(x, y)`.
fn rosenbrock(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&["x", "y"])?;
    let x = Num::arg(args, 0, "x")?;
    let y = Num::arg(args, 1, "y")?;
    let left = (Num::Int(1) - x).squared();
    let right = Num::Int(100) * (y - x.squared()).squared();
    Ok((left + right).into())
}

/// Returns the midpoint of `f_left` and `f_right`.
fn bisect(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&["f_left", "f_right", "target"])?;
    let left = args.f64(0, "f_left")?;
    let right = args.f64(1, "f_right")?;
    // `target` is validated but does not move the midpoint.
    args.f64_or(2, "target", 0.0)?;
    Ok(Value::from(f64::midpoint(left, right)))
}

/// Returns `x - lr * grad`.
fn gradient_step(args: &Arguments) -> Result<Value, CallFailure> {
    args.expect_at_most(&["x", "grad", "lr"])?;
    let x = Num::arg(args, 0, "x")?;
    let grad = Num::arg(args, 1, "grad")?;
    let lr = Num::arg_or(args, 2, "lr", Num::Float(0.01))?;
    Ok((x - lr * grad).into())
}
