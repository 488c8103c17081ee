// crates/leap-cli/src/project.rs
// ============================================================================
// Module: Experiment Project Tools
// Description: Open, list, validate, and scaffold experiment directories.
// Purpose: Back the `list`, `validate`, `new` and per-experiment commands.
// Dependencies: leap-core, leap-functions
// ============================================================================

//! ## Overview
//! These helpers operate directly on an experiments root without a running
//! server. Validation reports one [`CheckResult`] per concern so the CLI can
//! print warnings and still exit cleanly; only [`CheckStatus::Error`] fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use leap_core::ExperimentContext;
use leap_core::ExperimentMetadata;
use leap_core::ExperimentName;
use leap_core::ExperimentRegistry;
use leap_core::ExperimentSummary;
use leap_core::FUNCS_DIR;
use leap_core::FunctionLibrary;
use leap_core::README_FILE;
use leap_core::ReadmeDocument;
use leap_core::StoreOpener;
use leap_core::UI_DIR;
use leap_core::is_valid_experiment_name;
use leap_core::load_functions;
use leap_core::load_manifest;
use leap_core::manifest_paths;

use crate::error::ToolError;

// ============================================================================
// SECTION: Opening
// ============================================================================

/// Loads one experiment under `root` for offline administration.
///
/// # Errors
///
/// Returns [`ToolError`] when the name is invalid, the directory is missing,
/// or the experiment cannot be loaded.
pub fn open_experiment(
    root: &Path,
    name: &str,
    library: Arc<FunctionLibrary>,
    opener: &dyn StoreOpener,
) -> Result<ExperimentContext, ToolError> {
    let name = ExperimentName::parse(name)?;
    let path = root.join(name.as_str());
    if !path.is_dir() {
        return Err(ToolError::Invalid(format!(
            "Experiment '{name}' not found at {}",
            path.display()
        )));
    }
    Ok(ExperimentContext::load(name, &path, library, opener)?)
}

/// Discovers every experiment under `root` and returns its listing entry.
#[must_use]
pub fn list_experiments(
    root: &Path,
    library: Arc<FunctionLibrary>,
    opener: &dyn StoreOpener,
) -> Vec<ExperimentSummary> {
    ExperimentRegistry::discover(root, library, opener).iter().map(|ctx| ctx.summary()).collect()
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Outcome of one validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Ok,
    /// Experiment loads but something looks wrong.
    Warning,
    /// Experiment cannot be served as is.
    Error,
}

impl CheckStatus {
    /// Short label for terminal output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Concern being checked.
    pub check: &'static str,
    /// Outcome.
    pub status: CheckStatus,
    /// Human-readable detail.
    pub message: String,
}

impl CheckResult {
    /// Builds a finding.
    fn new(check: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            check,
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status.label(), self.check, self.message)
    }
}

/// Returns true when any finding is an error.
#[must_use]
pub fn has_errors(results: &[CheckResult]) -> bool {
    results.iter().any(|result| result.status == CheckStatus::Error)
}

/// Validates the layout of experiment `name` under `root`.
///
/// Checks run in order: name, directory, README, manifests, entry point. A
/// bad name or missing directory stops the run.
#[must_use]
pub fn validate_experiment(root: &Path, name: &str, library: &FunctionLibrary) -> Vec<CheckResult> {
    let mut results = Vec::new();
    if !is_valid_experiment_name(name) {
        results.push(CheckResult::new("name", CheckStatus::Error, format!("Invalid name '{name}'")));
        return results;
    }
    results.push(CheckResult::new("name", CheckStatus::Ok, "valid"));

    let path = root.join(name);
    if !path.is_dir() {
        results.push(CheckResult::new(
            "directory",
            CheckStatus::Error,
            format!("not found: {}", path.display()),
        ));
        return results;
    }
    results.push(CheckResult::new("directory", CheckStatus::Ok, path.display().to_string()));

    let metadata = match ReadmeDocument::read(&path.join(README_FILE)) {
        Ok(Some(document)) => {
            let metadata = ExperimentMetadata::from_frontmatter(&document.frontmatter);
            results.push(CheckResult::new(
                "readme",
                CheckStatus::Ok,
                format!("frontmatter parsed ({})", metadata.display_name_or(name)),
            ));
            metadata
        }
        Ok(None) => {
            results.push(CheckResult::new("readme", CheckStatus::Warning, "README.md missing"));
            ExperimentMetadata::default()
        }
        Err(err) => {
            results.push(CheckResult::new(
                "readme",
                CheckStatus::Error,
                format!("README.md unreadable: {err}"),
            ));
            ExperimentMetadata::default()
        }
    };

    check_functions(&path.join(FUNCS_DIR), library, &mut results);
    check_entry_point(&path.join(UI_DIR), &metadata.entry_point, &mut results);
    results
}

/// Reports manifest failures and the loaded function count.
fn check_functions(funcs_dir: &Path, library: &FunctionLibrary, results: &mut Vec<CheckResult>) {
    if !funcs_dir.is_dir() {
        results.push(CheckResult::new("funcs", CheckStatus::Warning, "funcs/ directory missing"));
        return;
    }
    for manifest in manifest_paths(funcs_dir) {
        if let Err(err) = load_manifest(&manifest, library) {
            results.push(CheckResult::new("manifest", CheckStatus::Warning, err.to_string()));
        }
    }
    let count = load_functions(funcs_dir, library).len();
    if count == 0 {
        results.push(CheckResult::new("funcs", CheckStatus::Warning, "no functions found"));
    } else {
        results.push(CheckResult::new(
            "funcs",
            CheckStatus::Ok,
            format!("{count} function(s) loaded"),
        ));
    }
}

/// Checks that the UI entry page stays inside `ui/` and exists.
fn check_entry_point(ui_dir: &Path, entry_point: &str, results: &mut Vec<CheckResult>) {
    let relative = Path::new(entry_point);
    if !relative.components().all(|component| matches!(component, Component::Normal(_))) {
        results.push(CheckResult::new(
            "entry_point",
            CheckStatus::Error,
            format!("{entry_point} must be a relative path inside ui/"),
        ));
        return;
    }
    if ui_dir.join(relative).is_file() {
        results.push(CheckResult::new("entry_point", CheckStatus::Ok, format!("{entry_point} exists")));
    } else {
        results.push(CheckResult::new(
            "entry_point",
            CheckStatus::Warning,
            format!("{entry_point} not found in ui/"),
        ));
    }
}

// ============================================================================
// SECTION: Scaffolding
// ============================================================================

/// Manifest written into new experiments.
const STARTER_MANIFEST: &str = "# Selects the `open_funcs` module of the built-in library.\n\
                                # Add more manifests (one per module) to expose more functions.\n\
                                module = \"open_funcs\"\n";

/// Creates a new experiment skeleton under `root`.
///
/// # Errors
///
/// Returns [`ToolError`] when the name is invalid, the experiment already
/// exists, or a file cannot be written.
pub fn scaffold_experiment(root: &Path, name: &str) -> Result<PathBuf, ToolError> {
    if !is_valid_experiment_name(name) {
        return Err(ToolError::Invalid(format!(
            "Invalid experiment name '{name}'. Must match [a-z0-9][a-z0-9_-]* (lowercase, \
             digits, hyphens, underscores)."
        )));
    }
    let path = root.join(name);
    if path.exists() {
        return Err(ToolError::Invalid(format!(
            "Experiment '{name}' already exists at {}",
            path.display()
        )));
    }
    let title = title_case(name);
    for dir in [FUNCS_DIR, UI_DIR, "db"] {
        create_dir(&path.join(dir))?;
    }
    write_file(&path.join(README_FILE), &readme_template(name, &title))?;
    write_file(&path.join(FUNCS_DIR).join("open_funcs.toml"), STARTER_MANIFEST)?;
    write_file(&path.join(UI_DIR).join("dashboard.html"), &dashboard_template(&title))?;
    Ok(path)
}

/// Turns `my-first_lab` into `My First Lab`.
fn title_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// README with default frontmatter.
fn readme_template(name: &str, title: &str) -> String {
    format!(
        "---\nname: {name}\ndisplay_name: {title}\ndescription: \"\"\nentry_point: \
         dashboard.html\nrequire_registration: true\n---\n\n# {title}\n\nExperiment instructions \
         go here.\n"
    )
}

/// Minimal dashboard page.
fn dashboard_template(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\">\n  \
         <title>{title}</title>\n</head>\n<body>\n  <main>\n    <h1>{title}</h1>\n    <p>Edit \
         this page or add visualizations.</p>\n  </main>\n</body>\n</html>\n"
    )
}

/// Creates a directory and its parents.
fn create_dir(path: &Path) -> Result<(), ToolError> {
    fs::create_dir_all(path)
        .map_err(|err| ToolError::Io(format!("failed to create {}: {err}", path.display())))
}

/// Writes a UTF-8 file.
fn write_file(path: &Path, contents: &str) -> Result<(), ToolError> {
    fs::write(path, contents)
        .map_err(|err| ToolError::Io(format!("failed to write {}: {err}", path.display())))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_split_on_separators() {
        assert_eq!(title_case("my-first_lab"), "My First Lab");
        assert_eq!(title_case("lab2"), "Lab2");
        assert_eq!(title_case("a--b"), "A B");
    }
}
