// crates/leap-core/src/core/log.rs
// ============================================================================
// Module: LEAP Call Log Types
// Description: Call log entries, query filters, and pagination order.
// Purpose: Define the append-only call record and its query contract.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every RPC call that is not opted out of logging produces one
//! [`CallLogEntry`]. Entries are ordered by a store-assigned id that is
//! strictly increasing and never reused. Queries page through entries with an
//! id cursor rather than offsets so concurrent appends never shift a page.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Smallest effective page size.
pub const MIN_LOG_LIMIT: i64 = 1;
/// Largest effective page size.
pub const MAX_LOG_LIMIT: i64 = 10_000;
/// Page size used when the caller gives none.
pub const DEFAULT_LOG_LIMIT: i64 = 100;

/// Clamps a requested page size into `[MIN_LOG_LIMIT, MAX_LOG_LIMIT]`.
#[must_use]
pub const fn clamp_limit(requested: i64) -> i64 {
    if requested < MIN_LOG_LIMIT {
        MIN_LOG_LIMIT
    } else if requested > MAX_LOG_LIMIT {
        MAX_LOG_LIMIT
    } else {
        requested
    }
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// One persisted RPC invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    /// Store-assigned ordering key.
    pub id: i64,
    /// UTC instant at persistence.
    pub ts: Timestamp,
    /// Caller identity (not required to be registered).
    pub student_id: String,
    /// Owning experiment name.
    pub experiment: String,
    /// Optional caller-chosen trial label.
    pub trial: Option<String>,
    /// Invoked function name.
    pub func_name: String,
    /// Positional arguments as supplied.
    pub args: Value,
    /// Call result, null when absent or when the call failed.
    pub result: Value,
    /// Tagged error message when the call failed.
    pub error: Option<String>,
}

/// Log record awaiting persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCallLog {
    /// Caller identity.
    pub student_id: String,
    /// Owning experiment name.
    pub experiment: String,
    /// Invoked function name.
    pub func_name: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Call result when the call succeeded.
    pub result: Option<Value>,
    /// Tagged error message when the call failed.
    pub error: Option<String>,
    /// Optional trial label.
    pub trial: Option<String>,
}

impl NewCallLog {
    /// Returns the positional arguments as a JSON array.
    #[must_use]
    pub fn args_value(&self) -> Value {
        Value::Array(self.args.clone())
    }

    /// Returns the result with failed calls forced to null.
    #[must_use]
    pub fn result_value(&self) -> Value {
        if self.error.is_some() {
            return Value::Null;
        }
        self.result.clone().unwrap_or(Value::Null)
    }

    /// Materializes the entry with its assigned id and timestamp.
    #[must_use]
    pub fn into_entry(self, id: i64, ts: Timestamp) -> CallLogEntry {
        let args = self.args_value();
        let result = self.result_value();
        CallLogEntry {
            id,
            ts,
            student_id: self.student_id,
            experiment: self.experiment,
            trial: self.trial,
            func_name: self.func_name,
            args,
            result,
            error: self.error,
        }
    }
}

/// Decodes a stored JSON payload, falling back to the raw text.
#[must_use]
pub fn decode_payload(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Pagination order for log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrder {
    /// Newest first (id descending).
    #[default]
    Latest,
    /// Oldest first (id ascending).
    Earliest,
}

impl LogOrder {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Earliest => "earliest",
        }
    }
}

impl fmt::Display for LogOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "latest" => Ok(Self::Latest),
            "earliest" => Ok(Self::Earliest),
            other => Err(format!("order must be 'latest' or 'earliest', got '{other}'")),
        }
    }
}

/// Filters and pagination for a log query. All filters are ANDed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Exact student id match.
    pub student_id: Option<String>,
    /// Exact trial label match.
    pub trial: Option<String>,
    /// Exact function name match.
    pub func_name: Option<String>,
    /// Inclusive lower timestamp bound.
    pub start: Option<Timestamp>,
    /// Inclusive upper timestamp bound.
    pub end: Option<Timestamp>,
    /// Requested page size; clamped by [`LogQuery::effective_limit`].
    pub limit: i64,
    /// Page order.
    pub order: LogOrder,
    /// Cursor: strictly before (latest) or after (earliest) this id.
    pub after_id: Option<i64>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            student_id: None,
            trial: None,
            func_name: None,
            start: None,
            end: None,
            limit: DEFAULT_LOG_LIMIT,
            order: LogOrder::Latest,
            after_id: None,
        }
    }
}

impl LogQuery {
    /// Returns the clamped page size.
    #[must_use]
    pub const fn effective_limit(&self) -> i64 {
        clamp_limit(self.limit)
    }

    /// Returns true when `entry` satisfies every filter and the cursor.
    #[must_use]
    pub fn matches(&self, entry: &CallLogEntry) -> bool {
        if self.student_id.as_deref().is_some_and(|value| value != entry.student_id) {
            return false;
        }
        if self.trial.is_some() && self.trial != entry.trial {
            return false;
        }
        if self.func_name.as_deref().is_some_and(|value| value != entry.func_name) {
            return false;
        }
        if self.start.is_some_and(|start| entry.ts < start) {
            return false;
        }
        if self.end.is_some_and(|end| entry.ts > end) {
            return false;
        }
        match (self.order, self.after_id) {
            (_, None) => true,
            (LogOrder::Latest, Some(cursor)) => entry.id < cursor,
            (LogOrder::Earliest, Some(cursor)) => entry.id > cursor,
        }
    }
}

/// Filter choices offered to log viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    /// Registered student ids, ascending.
    pub students: Vec<String>,
    /// Distinct non-null trial labels, ascending.
    pub trials: Vec<String>,
    /// Total number of log entries.
    pub log_count: u64,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
