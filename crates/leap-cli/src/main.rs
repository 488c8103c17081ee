// crates/leap-cli/src/main.rs
// ============================================================================
// Module: LEAP CLI Entry Point
// Description: Command dispatcher for the LEAP server and experiment admin.
// Purpose: Run the HTTP server and manage experiments without it.
// Dependencies: clap, leap-cli, leap-config, leap-core, leap-server, tokio
// ============================================================================

//! ## Overview
//! `leap serve` starts the HTTP server. The remaining commands operate on the
//! experiments root directly: listing and validating experiments, scaffolding
//! new ones, student administration, and log export. Every command accepts
//! `--config` (see [`LeapConfig::load`]) and `--root` to override the
//! experiments root.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use leap_cli::ExportFormat;
use leap_cli::ToolError;
use leap_cli::export_logs;
use leap_cli::has_errors;
use leap_cli::import_students;
use leap_cli::init_tracing;
use leap_cli::list_experiments;
use leap_cli::open_experiment;
use leap_cli::scaffold_experiment;
use leap_cli::validate_experiment;
use leap_config::LeapConfig;
use leap_config::config_toml_example;
use leap_core::ExperimentContext;
use leap_core::FunctionLibrary;
use leap_functions::builtin_library;
use leap_server::LeapServer;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a roster CSV file.
const MAX_ROSTER_BYTES: u64 = 16 * 1024 * 1024;
/// Log level used by commands other than `serve` when `RUST_LOG` is unset.
const ADMIN_LOG_LEVEL: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "leap", version, about = "LEAP experiment server and administration tools")]
struct Cli {
    /// Config file path (defaults to `LEAP_CONFIG` or ./leap.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Experiments root override.
    #[arg(long, value_name = "DIR", global = true)]
    root: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the LEAP HTTP server.
    Serve(ServeCommand),
    /// List discovered experiments.
    List,
    /// Validate an experiment's layout (README, manifests, entry point).
    Validate(ExperimentArgs),
    /// Scaffold a new experiment.
    New(NewCommand),
    /// Register a student.
    AddStudent(AddStudentCommand),
    /// List registered students.
    ListStudents(ExperimentArgs),
    /// Remove a student and their logs.
    DeleteStudent(DeleteStudentCommand),
    /// Register students from a CSV roster.
    ImportStudents(ImportStudentsCommand),
    /// Export all logs of an experiment.
    ExportLogs(ExportLogsCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Listen address override, e.g. `0.0.0.0:9000`.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

/// Commands addressing one experiment.
#[derive(Args, Debug)]
struct ExperimentArgs {
    /// Experiment name.
    experiment: String,
}

/// Arguments for `new`.
#[derive(Args, Debug)]
struct NewCommand {
    /// Experiment name (lowercase letters, digits, `-` and `_`).
    name: String,
}

/// Arguments for `add-student`.
#[derive(Args, Debug)]
struct AddStudentCommand {
    /// Experiment name.
    experiment: String,
    /// Student identifier.
    student_id: String,
    /// Display name (defaults to the id).
    #[arg(long)]
    name: Option<String>,
    /// Contact email.
    #[arg(long)]
    email: Option<String>,
}

/// Arguments for `delete-student`.
#[derive(Args, Debug)]
struct DeleteStudentCommand {
    /// Experiment name.
    experiment: String,
    /// Student identifier.
    student_id: String,
}

/// Arguments for `import-students`.
#[derive(Args, Debug)]
struct ImportStudentsCommand {
    /// Experiment name.
    experiment: String,
    /// Roster CSV with a `student_id` header (optional `name`, `email`).
    csv: PathBuf,
}

/// Arguments for `export-logs`.
#[derive(Args, Debug)]
struct ExportLogsCommand {
    /// Experiment name.
    experiment: String,
    /// Output encoding.
    #[arg(long, short = 'f', value_enum, default_value_t = ExportFormatArg::Jsonl)]
    format: ExportFormatArg,
    /// Output file; `-` writes to stdout (defaults to `<experiment>.<ext>`).
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Export formats accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportFormatArg {
    /// JSON lines.
    #[value(alias = "jsonlines")]
    Jsonl,
    /// CSV with header.
    Csv,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(value: ExportFormatArg) -> Self {
        match value {
            ExportFormatArg::Jsonl => Self::JsonLines,
            ExportFormatArg::Csv => Self::Csv,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the resolved configuration.
    Validate,
    /// Print an example `leap.toml`.
    Example,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message shown to the user.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<ToolError> for CliError {
    fn from(err: ToolError) -> Self {
        Self::new(err.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.root)?;
    if !matches!(cli.command, Commands::Serve(_) | Commands::Config { .. }) {
        init_tracing(ADMIN_LOG_LEVEL, config.logging.format)?;
    }

    match cli.command {
        Commands::Serve(command) => command_serve(command, config).await,
        Commands::List => command_list(&config),
        Commands::Validate(args) => command_validate(&args, &config),
        Commands::New(command) => command_new(&command, &config),
        Commands::AddStudent(command) => command_add_student(&command, &config),
        Commands::ListStudents(args) => command_list_students(&args, &config),
        Commands::DeleteStudent(command) => command_delete_student(&command, &config),
        Commands::ImportStudents(command) => command_import_students(&command, &config),
        Commands::ExportLogs(command) => command_export_logs(&command, &config),
        Commands::Config {
            command,
        } => command_config(&command, &config),
    }
}

/// Loads configuration and applies the `--root` override.
fn load_config(path: Option<&Path>, root: Option<PathBuf>) -> CliResult<LeapConfig> {
    let mut config = LeapConfig::load(path)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if let Some(root) = root {
        config.experiments.root = root;
    }
    Ok(config)
}

/// Opens one experiment with the built-in library and configured storage.
fn open(config: &LeapConfig, experiment: &str) -> CliResult<ExperimentContext> {
    Ok(open_experiment(
        &config.experiments.root,
        experiment,
        Arc::new(builtin_library()),
        &config.store_opener(),
    )?)
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand, mut config: LeapConfig) -> CliResult<ExitCode> {
    if let Some(bind) = command.bind {
        config.server.bind = bind;
    }
    init_tracing(&config.logging.level, config.logging.format)?;
    warn_network_exposure(&config)?;

    let library: Arc<FunctionLibrary> = Arc::new(builtin_library());
    let server = tokio::task::spawn_blocking(move || LeapServer::from_config(&config, library))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Warns when admin routes are reachable from the network without tokens.
fn warn_network_exposure(config: &LeapConfig) -> CliResult<()> {
    let Ok(addr) = config.server.bind.trim().parse::<SocketAddr>() else {
        return Ok(());
    };
    if !addr.ip().is_loopback() && config.server.auth.bearer_tokens.is_empty() {
        write_stderr_line(&format!(
            "warning: listening on {addr} without bearer tokens; admin routes accept loopback \
             peers only"
        ))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Experiment Commands
// ============================================================================

/// Executes the `list` command.
fn command_list(config: &LeapConfig) -> CliResult<ExitCode> {
    let experiments = list_experiments(
        &config.experiments.root,
        Arc::new(builtin_library()),
        &config.store_opener(),
    );
    if experiments.is_empty() {
        write_stdout("No experiments found.")?;
        return Ok(ExitCode::SUCCESS);
    }
    write_stdout(&format!("{:<20} {:<25} {:>5}  {}", "Name", "Display Name", "Funcs", "Registration"))?;
    write_stdout(&"-".repeat(75))?;
    for summary in experiments {
        let registration = if summary.require_registration { "required" } else { "open" };
        write_stdout(&format!(
            "{:<20} {:<25} {:>5}  {}",
            summary.name, summary.display_name, summary.function_count, registration
        ))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `validate` command.
fn command_validate(args: &ExperimentArgs, config: &LeapConfig) -> CliResult<ExitCode> {
    let results = validate_experiment(&config.experiments.root, &args.experiment, &builtin_library());
    for result in &results {
        write_stdout(&format!("  {result}"))?;
    }
    if has_errors(&results) {
        return Ok(ExitCode::FAILURE);
    }
    write_stdout("Validation passed.")?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `new` command.
fn command_new(command: &NewCommand, config: &LeapConfig) -> CliResult<ExitCode> {
    let path = scaffold_experiment(&config.experiments.root, &command.name)?;
    write_stdout(&format!("Created experiment '{}' at {}", command.name, path.display()))?;
    write_stdout("Next steps:")?;
    write_stdout(&format!("  1. Add function manifests under {}/funcs/", path.display()))?;
    write_stdout(&format!("  2. Edit {}/README.md", path.display()))?;
    write_stdout("  3. Restart the server or reload functions")?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Student Commands
// ============================================================================

/// Executes the `add-student` command.
fn command_add_student(command: &AddStudentCommand, config: &LeapConfig) -> CliResult<ExitCode> {
    let ctx = open(config, &command.experiment)?;
    let name = command.name.as_deref().unwrap_or(&command.student_id);
    let student = ctx
        .add_student(&command.student_id, name, command.email.as_deref())
        .map_err(|err| CliError::from(ToolError::from(err)))?;
    write_stdout(&format!("Added student '{}' to '{}'", student.student_id, command.experiment))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `list-students` command.
fn command_list_students(args: &ExperimentArgs, config: &LeapConfig) -> CliResult<ExitCode> {
    let ctx = open(config, &args.experiment)?;
    let students = ctx.list_students().map_err(|err| CliError::from(ToolError::from(err)))?;
    if students.is_empty() {
        write_stdout("No students registered.")?;
        return Ok(ExitCode::SUCCESS);
    }
    write_stdout(&format!("{:<20} {:<30} {}", "Student ID", "Name", "Email"))?;
    write_stdout(&"-".repeat(70))?;
    for student in students {
        write_stdout(&format!(
            "{:<20} {:<30} {}",
            student.student_id.as_str(),
            student.name,
            student.email.as_deref().unwrap_or("")
        ))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `delete-student` command.
fn command_delete_student(
    command: &DeleteStudentCommand,
    config: &LeapConfig,
) -> CliResult<ExitCode> {
    let ctx = open(config, &command.experiment)?;
    let deleted = ctx
        .delete_student(&command.student_id)
        .map_err(|err| CliError::from(ToolError::from(err)))?;
    if !deleted {
        return Err(CliError::new(format!("Student '{}' not found", command.student_id)));
    }
    write_stdout(&format!(
        "Deleted student '{}' from '{}'",
        command.student_id, command.experiment
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `import-students` command.
fn command_import_students(
    command: &ImportStudentsCommand,
    config: &LeapConfig,
) -> CliResult<ExitCode> {
    let text = read_text_with_limit(&command.csv, MAX_ROSTER_BYTES)?;
    let ctx = open(config, &command.experiment)?;
    let report = import_students(&ctx, &text)?;
    for skipped in &report.skipped {
        write_stderr_line(&format!("  line {}: skipped: {}", skipped.line, skipped.reason))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    write_stdout(&format!(
        "Imported {} student(s) into '{}' ({} skipped)",
        report.added.len(),
        command.experiment,
        report.skipped.len()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Reads a UTF-8 file no larger than `max_bytes`.
fn read_text_with_limit(path: &Path, max_bytes: u64) -> CliResult<String> {
    let file = File::open(path)
        .map_err(|err| CliError::new(format!("failed to open {}: {err}", path.display())))?;
    let mut bytes = Vec::new();
    file.take(max_bytes + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > max_bytes {
        return Err(CliError::new(format!("{} exceeds size limit", path.display())));
    }
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(format!("{} must be utf-8", path.display())))
}

// ============================================================================
// SECTION: Export Command
// ============================================================================

/// Executes the `export-logs` command.
fn command_export_logs(command: &ExportLogsCommand, config: &LeapConfig) -> CliResult<ExitCode> {
    let format = ExportFormat::from(command.format);
    let ctx = open(config, &command.experiment)?;
    let output = command
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.{}", command.experiment, format.extension())));

    if output.as_os_str() == "-" {
        let stdout = std::io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        let count = export_logs(&ctx, format, &mut writer)?;
        write_stderr_line(&format!("Exported {count} log(s) ({})", format.extension()))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let file = File::create(&output)
        .map_err(|err| CliError::new(format!("failed to create {}: {err}", output.display())))?;
    let mut writer = BufWriter::new(file);
    let count = export_logs(&ctx, format, &mut writer)?;
    write_stdout(&format!(
        "Exported {count} log(s) to {} ({})",
        output.display(),
        format.extension()
    ))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes config subcommands.
fn command_config(command: &ConfigCommand, config: &LeapConfig) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => {
            let source = config
                .source_path
                .as_ref()
                .map_or_else(|| "built-in defaults".to_string(), |path| path.display().to_string());
            write_stdout(&format!("config ok ({source})"))?;
            write_stdout(&format!("  bind: {}", config.server.bind))?;
            write_stdout(&format!("  experiments root: {}", config.experiments.root.display()))?;
            write_stdout(&format!("  database: <experiment>/{}", config.storage.db_file.display()))?;
            let root = &config.experiments.root;
            if !root.is_dir() {
                write_stdout(&format!("  warning: {} is not a directory", root.display()))?;
            } else if let Ok(entries) = fs::read_dir(root) {
                let count = entries.filter_map(Result::ok).filter(|entry| entry.path().is_dir()).count();
                write_stdout(&format!("  experiment directories: {count}"))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommand::Example => {
            write_stdout(config_toml_example().trim_end())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout, mapping failures to [`CliError`].
fn write_stdout(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
