// crates/leap-core/src/core/time.rs
// ============================================================================
// Module: LEAP Timestamps
// Description: UTC timestamps with microsecond precision.
// Purpose: Give log entries a sortable integer form and an ISO-8601 wire form.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`Timestamp`] is a count of microseconds since the Unix epoch, always
//! UTC. Stores persist the integer form so range filters compare numerically;
//! the wire form is `YYYY-MM-DDTHH:MM:SS.ffffffZ`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Canonical wire format for timestamps.
const WIRE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");
/// Naive date-time accepted for query bounds (interpreted as UTC).
const NAIVE_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
/// Naive date-time with fractional seconds accepted for query bounds.
const NAIVE_FRACTION: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
/// Bare date accepted for query bounds (midnight UTC).
const DATE_ONLY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp parsing and conversion errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// Input text is not a recognized date-time.
    #[error("invalid timestamp: {0}")]
    Parse(String),
    /// Value falls outside the representable range.
    #[error("timestamp out of range")]
    OutOfRange,
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// UTC instant with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Returns the current UTC instant.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc()).unwrap_or(Self(0))
    }

    /// Builds a timestamp from microseconds since the Unix epoch.
    #[must_use]
    pub const fn from_unix_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Returns microseconds since the Unix epoch.
    #[must_use]
    pub const fn unix_micros(self) -> i64 {
        self.0
    }

    /// Converts an `OffsetDateTime` into a timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::OutOfRange`] when the instant does not fit.
    pub fn from_datetime(value: OffsetDateTime) -> Result<Self, TimestampError> {
        let micros = value.unix_timestamp_nanos() / 1_000;
        i64::try_from(micros).map(Self).map_err(|_| TimestampError::OutOfRange)
    }

    /// Converts the timestamp back into a UTC `OffsetDateTime`.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::OutOfRange`] when the instant does not fit.
    pub fn to_datetime(self) -> Result<OffsetDateTime, TimestampError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * 1_000)
            .map_err(|_| TimestampError::OutOfRange)
    }

    /// Parses a query bound: RFC 3339, naive date-time (UTC), or bare date.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Parse`] when no accepted form matches.
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let trimmed = text.trim();
        if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Self::from_datetime(value);
        }
        for format in [NAIVE_FRACTION, NAIVE_SECONDS] {
            if let Ok(value) = PrimitiveDateTime::parse(trimmed, format) {
                return Self::from_datetime(value.assume_offset(UtcOffset::UTC));
            }
        }
        if let Ok(date) = Date::parse(trimmed, DATE_ONLY) {
            return Self::from_datetime(date.midnight().assume_offset(UtcOffset::UTC));
        }
        Err(TimestampError::Parse(trimmed.to_string()))
    }

    /// Renders the canonical wire form (`...Z`).
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when the instant cannot be formatted.
    pub fn to_iso8601(self) -> Result<String, TimestampError> {
        self.to_datetime()?.format(WIRE_FORMAT).map_err(|_| TimestampError::OutOfRange)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_iso8601() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "@{}us", self.0),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_iso8601().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
