// crates/leap-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and bounded input reads.
// Purpose: Keep the command surface and input limits stable.
// Dependencies: leap-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Parses representative command lines and checks that roster reads fail
//! closed on oversized or non-UTF-8 input.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use clap::CommandFactory;
use clap::Parser;
use leap_cli::ExportFormat;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::ExportFormatArg;
use super::load_config;
use super::read_text_with_limit;

// ============================================================================
// SECTION: Parsing
// ============================================================================

#[test]
fn command_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn global_flags_apply_after_subcommand() {
    let cli = Cli::try_parse_from(["leap", "list", "--root", "labs", "--config", "leap.toml"])
        .expect("parse");
    assert_eq!(cli.root, Some(PathBuf::from("labs")));
    assert_eq!(cli.config, Some(PathBuf::from("leap.toml")));
    assert!(matches!(cli.command, Commands::List));
}

#[test]
fn serve_accepts_bind_override() {
    let cli = Cli::try_parse_from(["leap", "serve", "--bind", "0.0.0.0:9000"]).expect("parse");
    let Commands::Serve(command) = cli.command else {
        panic!("expected serve");
    };
    assert_eq!(command.bind.as_deref(), Some("0.0.0.0:9000"));
}

#[test]
fn add_student_parses_optional_fields() {
    let cli = Cli::try_parse_from([
        "leap",
        "add-student",
        "default",
        "s001",
        "--name",
        "Ada",
        "--email",
        "ada@example.edu",
    ])
    .expect("parse");
    let Commands::AddStudent(command) = cli.command else {
        panic!("expected add-student");
    };
    assert_eq!(command.experiment, "default");
    assert_eq!(command.student_id, "s001");
    assert_eq!(command.name.as_deref(), Some("Ada"));
    assert_eq!(command.email.as_deref(), Some("ada@example.edu"));
}

#[test]
fn export_defaults_to_json_lines() {
    let cli = Cli::try_parse_from(["leap", "export-logs", "default"]).expect("parse");
    let Commands::ExportLogs(command) = cli.command else {
        panic!("expected export-logs");
    };
    assert_eq!(command.format, ExportFormatArg::Jsonl);
    assert_eq!(ExportFormat::from(command.format), ExportFormat::JsonLines);
    assert!(command.output.is_none());
}

#[test]
fn export_accepts_csv_and_output() {
    let cli = Cli::try_parse_from(["leap", "export-logs", "default", "-f", "csv", "-o", "-"])
        .expect("parse");
    let Commands::ExportLogs(command) = cli.command else {
        panic!("expected export-logs");
    };
    assert_eq!(ExportFormat::from(command.format), ExportFormat::Csv);
    assert_eq!(command.output, Some(PathBuf::from("-")));
}

#[test]
fn export_rejects_unknown_format() {
    assert!(Cli::try_parse_from(["leap", "export-logs", "default", "-f", "xml"]).is_err());
}

#[test]
fn config_subcommands_parse() {
    let cli = Cli::try_parse_from(["leap", "config", "example"]).expect("parse");
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Example
        }
    ));
}

#[test]
fn missing_positional_is_an_error() {
    assert!(Cli::try_parse_from(["leap", "delete-student", "default"]).is_err());
}

// ============================================================================
// SECTION: Config Loading
// ============================================================================

#[test]
fn root_flag_overrides_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("leap.toml");
    fs::write(&path, "[experiments]\nroot = \"from-file\"\n").expect("write config");
    let config = load_config(Some(path.as_path()), Some(PathBuf::from("from-flag"))).expect("load");
    assert_eq!(config.experiments.root, PathBuf::from("from-flag"));
}

#[test]
fn missing_config_file_is_reported() {
    let err = load_config(Some(Path::new("/nonexistent/leap.toml")), None).unwrap_err();
    assert!(err.to_string().starts_with("failed to load config"));
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_within_limit_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roster.csv");
    fs::write(&path, "student_id\ns001\n").expect("write");
    assert_eq!(read_text_with_limit(&path, 64).expect("read"), "student_id\ns001\n");
}

#[test]
fn read_over_limit_fails_closed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roster.csv");
    fs::write(&path, vec![b'a'; 65]).expect("write");
    let err = read_text_with_limit(&path, 64).unwrap_err();
    assert!(err.to_string().contains("exceeds size limit"));
}

#[test]
fn read_rejects_invalid_utf8() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roster.csv");
    fs::write(&path, [0xff, 0xfe, b'\n']).expect("write");
    let err = read_text_with_limit(&path, 64).unwrap_err();
    assert!(err.to_string().contains("utf-8"));
}
