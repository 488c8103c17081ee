// crates/leap-core/src/experiment/metadata.rs
// ============================================================================
// Module: LEAP Experiment Metadata
// Description: README frontmatter parsing with safe defaults.
// Purpose: Derive experiment settings from the declared README metadata.
// Dependencies: serde, serde_json, serde_yaml, tracing
// ============================================================================

//! ## Overview
//! An experiment declares its metadata in YAML frontmatter at the top of its
//! `README.md`, delimited by `---` lines. Parsing never fails: a missing
//! README, missing delimiters, or malformed YAML all yield the defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Frontmatter delimiter.
const FRONTMATTER_DELIMITER: &str = "---";
/// Entry page served by the UI when the README names none.
pub const DEFAULT_ENTRY_POINT: &str = "dashboard.html";

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Typed experiment settings derived from frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Human-readable title; empty means "use the experiment name".
    pub display_name: String,
    /// Short description.
    pub description: String,
    /// Author-declared version label.
    pub version: String,
    /// UI entry page.
    pub entry_point: String,
    /// Whether non-exempt functions require a registered caller.
    pub require_registration: bool,
}

impl Default for ExperimentMetadata {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            description: String::new(),
            version: String::new(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            require_registration: true,
        }
    }
}

impl ExperimentMetadata {
    /// Reads typed settings from a frontmatter mapping, keeping defaults for
    /// absent or unusable values.
    #[must_use]
    pub fn from_frontmatter(frontmatter: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            display_name: scalar_text(frontmatter.get("display_name"))
                .unwrap_or(defaults.display_name),
            description: scalar_text(frontmatter.get("description"))
                .unwrap_or(defaults.description),
            version: scalar_text(frontmatter.get("version")).unwrap_or(defaults.version),
            entry_point: scalar_text(frontmatter.get("entry_point"))
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.entry_point),
            require_registration: flag(frontmatter.get("require_registration"))
                .unwrap_or(defaults.require_registration),
        }
    }

    /// Returns the display name, falling back to `name` when empty.
    #[must_use]
    pub fn display_name_or<'a>(&'a self, name: &'a str) -> &'a str {
        if self.display_name.is_empty() { name } else { &self.display_name }
    }

    /// Returns the defaults as a frontmatter mapping.
    #[must_use]
    pub fn default_frontmatter() -> Map<String, Value> {
        let defaults = Self::default();
        let mut map = Map::new();
        map.insert("display_name".to_string(), Value::String(defaults.display_name));
        map.insert("description".to_string(), Value::String(defaults.description));
        map.insert("version".to_string(), Value::String(defaults.version));
        map.insert("entry_point".to_string(), Value::String(defaults.entry_point));
        map.insert("require_registration".to_string(), Value::Bool(defaults.require_registration));
        map
    }
}

// ============================================================================
// SECTION: README Documents
// ============================================================================

/// README split into frontmatter and body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadmeDocument {
    /// Frontmatter merged over the defaults.
    pub frontmatter: Map<String, Value>,
    /// Markdown body with surrounding whitespace trimmed.
    pub body: String,
}

impl ReadmeDocument {
    /// Parses README text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (raw, body) = split_frontmatter(text);
        Self {
            frontmatter: parse_frontmatter(raw),
            body: body.trim().to_string(),
        }
    }

    /// Reads and parses a README file; `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the file exists but cannot be read.
    pub fn read(path: &Path) -> io::Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse(&text))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Splits README text into raw frontmatter (when delimited) and body.
#[must_use]
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix(FRONTMATTER_DELIMITER) else {
        return (None, text);
    };
    match rest.find(FRONTMATTER_DELIMITER) {
        Some(end) => {
            let body_start = end + FRONTMATTER_DELIMITER.len();
            (Some(&rest[.. end]), &rest[body_start ..])
        }
        None => (None, text),
    }
}

/// Parses raw frontmatter YAML, merged over the defaults. Never fails.
#[must_use]
pub fn parse_frontmatter(raw: Option<&str>) -> Map<String, Value> {
    let mut merged = ExperimentMetadata::default_frontmatter();
    let Some(raw) = raw else {
        return merged;
    };
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => merged.extend(map),
        Ok(Value::Null) => {}
        Ok(_) => warn!("README frontmatter is not a mapping; using defaults"),
        Err(err) => warn!(error = %err, "bad README frontmatter; using defaults"),
    }
    merged
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a scalar as text; `None` for null, arrays, and objects.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads a boolean flag, accepting common string spellings.
fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_i64().map(|value| value != 0),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn frontmatter_overrides_defaults() {
        let doc = ReadmeDocument::parse(
            "---\ndisplay_name: Intro Lab\nversion: 1.2\nrequire_registration: false\n---\n\n# Hello\n",
        );
        let meta = ExperimentMetadata::from_frontmatter(&doc.frontmatter);
        assert_eq!(meta.display_name, "Intro Lab");
        assert_eq!(meta.version, "1.2");
        assert_eq!(meta.entry_point, DEFAULT_ENTRY_POINT);
        assert!(!meta.require_registration);
        assert_eq!(doc.body, "# Hello");
    }

    #[test]
    fn malformed_frontmatter_falls_back() {
        let doc = ReadmeDocument::parse("---\n: : [unclosed\n---\nbody");
        assert_eq!(ExperimentMetadata::from_frontmatter(&doc.frontmatter), ExperimentMetadata::default());
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn missing_delimiters_keep_whole_body() {
        let (raw, body) = split_frontmatter("# Title\ntext");
        assert!(raw.is_none());
        assert_eq!(body, "# Title\ntext");
        let (raw, body) = split_frontmatter("---\nunterminated");
        assert!(raw.is_none());
        assert_eq!(body, "---\nunterminated");
    }

    #[test]
    fn display_name_falls_back_to_experiment_name() {
        let meta = ExperimentMetadata::default();
        assert_eq!(meta.display_name_or("default"), "default");
    }
}
