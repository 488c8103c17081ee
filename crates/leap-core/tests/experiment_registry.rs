// crates/leap-core/tests/experiment_registry.rs
// ============================================================================
// Module: Experiment Registry Tests
// Description: Discovery, metadata defaults, isolation, and reloads.
// Purpose: Ensure one bad experiment never hides the others.
// ============================================================================

//! ## Overview
//! Builds throwaway experiment roots and checks what the registry discovers.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use leap_core::CallRequest;
use leap_core::ExperimentName;
use leap_core::ExperimentRegistry;
use leap_core::FunctionDef;
use leap_core::FunctionLibrary;
use leap_core::FunctionModule;
use leap_core::InMemoryStoreOpener;
use leap_core::RegistryError;
use leap_core::SharedExperimentStore;
use leap_core::StoreError;
use leap_core::StoreOpener;
use leap_core::StudentError;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn library() -> Arc<FunctionLibrary> {
    Arc::new(
        FunctionLibrary::new()
            .with_module(
                FunctionModule::new("math_funcs")
                    .with(FunctionDef::new("square", |args| {
                        let x = args.f64(0, "x")?;
                        Ok(json!(x * x))
                    }))
                    .with(FunctionDef::new("add", |args| Ok(json!(args.f64(0, "a")? + args.f64(1, "b")?)))),
            )
            .with_module(
                FunctionModule::new("open_funcs")
                    .with(FunctionDef::new("ping", |_| Ok(json!("pong"))).noregcheck()),
            ),
    )
}

fn experiment(root: &Path, name: &str, readme: Option<&str>, manifests: &[&str]) {
    let dir = root.join(name);
    fs::create_dir_all(dir.join("funcs")).unwrap();
    if let Some(text) = readme {
        fs::write(dir.join("README.md"), text).unwrap();
    }
    for module in manifests {
        fs::write(dir.join("funcs").join(format!("{module}.toml")), "").unwrap();
    }
}

/// Opener that refuses one experiment.
struct RefusingOpener(&'static str);

impl StoreOpener for RefusingOpener {
    fn open(&self, experiment: &ExperimentName, dir: &Path) -> Result<SharedExperimentStore, StoreError> {
        if experiment.as_str() == self.0 {
            return Err(StoreError::Unavailable("refused".to_string()));
        }
        InMemoryStoreOpener.open(experiment, dir)
    }
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

#[test]
fn discovers_valid_directories_in_sorted_order() {
    let root = tempfile::tempdir().unwrap();
    experiment(root.path(), "zeta", None, &["math_funcs"]);
    experiment(root.path(), "alpha", None, &["open_funcs"]);
    experiment(root.path(), "Bad_Name", None, &[]);
    experiment(root.path(), "_hidden", None, &[]);
    fs::write(root.path().join("stray.txt"), "not a dir").unwrap();

    let registry = ExperimentRegistry::discover(root.path(), library(), &InMemoryStoreOpener);
    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    assert_eq!(registry.lookup("zeta").unwrap().functions().len(), 2);
}

#[test]
fn missing_root_is_empty() {
    let root = tempfile::tempdir().unwrap();
    let registry =
        ExperimentRegistry::discover(&root.path().join("absent"), library(), &InMemoryStoreOpener);
    assert!(registry.is_empty());
}

#[test]
fn one_failing_experiment_does_not_block_others() {
    let root = tempfile::tempdir().unwrap();
    experiment(root.path(), "good", None, &["math_funcs"]);
    experiment(root.path(), "broken", None, &["math_funcs"]);
    let registry = ExperimentRegistry::discover(root.path(), library(), &RefusingOpener("broken"));
    assert_eq!(registry.len(), 1);
    assert!(registry.lookup("good").is_ok());
    assert!(matches!(registry.lookup("broken"), Err(RegistryError::NotFound(_))));
}

#[test]
fn lookup_unknown_reports_not_found() {
    let registry = ExperimentRegistry::default();
    let err = registry.lookup("nope").unwrap_err();
    assert_eq!(err.to_string(), "Experiment 'nope' not found");
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

#[test]
fn metadata_comes_from_frontmatter_with_defaults() {
    let root = tempfile::tempdir().unwrap();
    experiment(
        root.path(),
        "lab",
        Some("---\ndisplay_name: Lab One\nrequire_registration: false\n---\nWelcome.\n"),
        &["math_funcs"],
    );
    experiment(root.path(), "plain", Some("# No frontmatter\n"), &[]);
    let registry = ExperimentRegistry::discover(root.path(), library(), &InMemoryStoreOpener);

    let lab = registry.lookup("lab").unwrap();
    let summary = lab.summary();
    assert_eq!(summary.display_name, "Lab One");
    assert!(!summary.require_registration);
    assert_eq!(summary.entry_point, "dashboard.html");
    assert_eq!(summary.function_count, 2);
    assert_eq!(summary.student_count, 0);
    let readme = lab.readme().unwrap().unwrap();
    assert_eq!(readme.body, "Welcome.");
    assert_eq!(readme.frontmatter["display_name"], json!("Lab One"));

    let plain = registry.lookup("plain").unwrap().summary();
    assert_eq!(plain.display_name, "plain");
    assert!(plain.require_registration);
}

#[test]
fn unreadable_readme_keeps_experiment_with_defaults() {
    let root = tempfile::tempdir().unwrap();
    experiment(root.path(), "lab", None, &["math_funcs"]);
    fs::write(root.path().join("lab").join("README.md"), b"---\ndisplay_name: Caf\xe9\n---\nbody\n")
        .unwrap();
    let registry = ExperimentRegistry::discover(root.path(), library(), &InMemoryStoreOpener);

    let names: Vec<&str> = registry.names().collect();
    assert_eq!(names, vec!["lab"]);
    let lab = registry.lookup("lab").unwrap();
    let summary = lab.summary();
    assert_eq!(summary.display_name, "lab");
    assert!(summary.require_registration);
    assert_eq!(summary.function_count, 2);
    assert!(matches!(lab.readme(), Err(RegistryError::Io { .. })));

    lab.add_student("s001", "Ada", None).unwrap();
    assert_eq!(lab.call(CallRequest::new("square", "s001", vec![json!(3)])).unwrap(), json!(9.0));
}

#[test]
fn unregistered_call_succeeds_when_registration_disabled() {
    let root = tempfile::tempdir().unwrap();
    experiment(root.path(), "open", Some("---\nrequire_registration: false\n---\n"), &["math_funcs"]);
    let registry = ExperimentRegistry::discover(root.path(), library(), &InMemoryStoreOpener);
    let ctx = registry.lookup("open").unwrap();
    let value = ctx.call(CallRequest::new("square", "visitor", vec![json!(3)])).unwrap();
    assert_eq!(value, json!(9.0));
}

// ============================================================================
// SECTION: Reloads and Students
// ============================================================================

#[test]
fn reload_swaps_whole_mapping() {
    let root = tempfile::tempdir().unwrap();
    experiment(root.path(), "lab", None, &["math_funcs"]);
    let registry = ExperimentRegistry::discover(root.path(), library(), &InMemoryStoreOpener);
    let ctx = registry.lookup("lab").unwrap();
    let before = ctx.functions();
    assert_eq!(before.len(), 2);

    fs::write(root.path().join("lab/funcs/open_funcs.toml"), "").unwrap();
    fs::remove_file(root.path().join("lab/funcs/math_funcs.toml")).unwrap();
    assert_eq!(registry.reload_functions("lab").unwrap(), 1);

    assert_eq!(before.len(), 2);
    let after = ctx.functions();
    assert!(after.contains("ping"));
    assert!(!after.contains("square"));
    assert!(matches!(registry.reload_functions("nope"), Err(RegistryError::NotFound(_))));
}

#[test]
fn student_admin_validates_and_rejects_duplicates() {
    let root = tempfile::tempdir().unwrap();
    experiment(root.path(), "lab", None, &[]);
    let registry = ExperimentRegistry::discover(root.path(), library(), &InMemoryStoreOpener);
    let ctx = registry.lookup("lab").unwrap();

    ctx.add_student("s002", "Bo", Some("bo@example.edu")).unwrap();
    ctx.add_student("s001", "Al", None).unwrap();
    assert_eq!(ctx.add_student("s001", "Al", None).unwrap_err(), StudentError::AlreadyExists("s001".to_string()));
    assert!(matches!(ctx.add_student("no spaces", "X", None), Err(StudentError::InvalidIdentity(_))));

    let ids: Vec<String> = ctx.list_students().unwrap().into_iter().map(|s| s.student_id.to_string()).collect();
    assert_eq!(ids, vec!["s001", "s002"]);
    assert!(ctx.is_registered("s001").unwrap());
    assert!(ctx.delete_student("s001").unwrap());
    assert!(!ctx.delete_student("s001").unwrap());
    assert_eq!(ctx.summary().student_count, 1);
}
