// crates/leap-functions/src/number.rs
// ============================================================================
// Module: Numeric Arguments
// Description: Integer-preserving arithmetic over JSON numbers.
// Purpose: Keep `square(7)` an integer while `square(1.5)` stays a float.
// Dependencies: leap-core, serde_json
// ============================================================================

//! ## Overview
//! JSON callers send integers and floats interchangeably. [`Num`] keeps an
//! integer result while every operand is an integer and promotes to `f64`
//! once a float is involved or `i64` arithmetic would overflow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Add;
use std::ops::Mul;
use std::ops::Sub;

use leap_core::Arguments;
use leap_core::CallFailure;
use serde_json::Value;

// ============================================================================
// SECTION: Num
// ============================================================================

/// A JSON number that remembers whether it was integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    /// Integral value.
    Int(i64),
    /// Floating value.
    Float(f64),
}

impl Num {
    /// Converts a JSON value into a number.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when `value` is not a JSON number.
    pub fn from_value(value: &Value, name: &str) -> Result<Self, CallFailure> {
        if let Some(int) = value.as_i64() {
            return Ok(Self::Int(int));
        }
        value
            .as_f64()
            .map(Self::Float)
            .ok_or_else(|| CallFailure::type_error(format!("argument '{name}' must be a number")))
    }

    /// Binds a required numeric parameter.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when missing or not a number.
    pub fn arg(args: &Arguments, index: usize, name: &str) -> Result<Self, CallFailure> {
        Self::from_value(args.value(index, name)?, name)
    }

    /// Binds an optional numeric parameter with a default.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when given but not a number.
    pub fn arg_or(
        args: &Arguments,
        index: usize,
        name: &str,
        default: Self,
    ) -> Result<Self, CallFailure> {
        args.value_opt(index, name)?.map_or(Ok(default), |value| Self::from_value(value, name))
    }

    /// Returns the value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Mixed arithmetic promotes to f64.")]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    /// Square of the number.
    #[must_use]
    pub fn squared(self) -> Self {
        self * self
    }

    /// Applies the integer op when possible, else the float op.
    fn combine(
        self,
        other: Self,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Self {
        if let (Self::Int(a), Self::Int(b)) = (self, other)
            && let Some(value) = int_op(a, b)
        {
            return Self::Int(value);
        }
        Self::Float(float_op(self.as_f64(), other.as_f64()))
    }
}

impl Add for Num {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.combine(other, i64::checked_add, |a, b| a + b)
    }
}

impl Sub for Num {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.combine(other, i64::checked_sub, |a, b| a - b)
    }
}

impl Mul for Num {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        self.combine(other, i64::checked_mul, |a, b| a * b)
    }
}

impl From<Num> for Value {
    fn from(value: Num) -> Self {
        match value {
            Num::Int(int) => Self::from(int),
            Num::Float(float) => Self::from(float),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::Value;
    use serde_json::json;

    use super::Num;

    #[test]
    fn integers_stay_integral() {
        assert_eq!(Value::from(Num::Int(7).squared()), json!(49));
        assert_eq!(Value::from(Num::Int(2) + Num::Float(0.5)), json!(2.5));
    }

    #[test]
    fn overflow_promotes_to_float() {
        assert!(matches!(Num::Int(i64::MAX) + Num::Int(1), Num::Float(_)));
    }

    #[test]
    fn non_numbers_are_type_errors() {
        let err = Num::from_value(&json!("7"), "x").unwrap_err();
        assert_eq!(err.kind, "TypeError");
    }
}
