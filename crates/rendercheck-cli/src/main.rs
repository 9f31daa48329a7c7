// crates/rendercheck-cli/src/main.rs
// ============================================================================
// Module: rendercheck CLI Entry Point
// Description: Command dispatcher for rendering regression runs.
// Purpose: Run, list, and configure render test suites from the shell.
// Dependencies: clap, rendercheck-config, rendercheck-core, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The rendercheck CLI loads harness configuration, layers command-line
//! overrides on top, runs the suite, and prints a per-test report. Exit codes:
//! 0 when every test passed, 1 when any test failed, 2 for setup errors
//! (configuration, filter, or discovery failures). All user-facing strings
//! are routed through the message catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use regex::Regex;
use rendercheck_cli::report;
use rendercheck_cli::t;
use rendercheck_config::HarnessConfig;
use rendercheck_core::EXIT_SETUP_ERROR;
use rendercheck_core::FanoutEventSink;
use rendercheck_core::FileEventSink;
use rendercheck_core::ImageArtifactLoader;
use rendercheck_core::NoopEventSink;
use rendercheck_core::RetentionPolicy;
use rendercheck_core::ShellCommandExecutor;
use rendercheck_core::StderrEventSink;
use rendercheck_core::SuiteEventSink;
use rendercheck_core::SuiteOrchestrator;
use rendercheck_core::SuiteReport;
use rendercheck_core::TestRunner;
use rendercheck_core::discover;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rendercheck", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the render tests under a root directory.
    Run(RunCommand),
    /// List the tests that would run.
    List(ListCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a rendercheck configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Suite root containing test directories.
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,
    /// Maximum number of tests running at once.
    #[arg(long, short = 'j', value_name = "N", value_parser = clap::value_parser!(u64).range(1..=1024))]
    jobs: Option<u64>,
    /// Default per-test timeout in seconds.
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,
    /// Only run tests whose name matches this regular expression.
    #[arg(long, value_name = "PATTERN")]
    filter: Option<String>,
    /// Optional config file path (defaults to rendercheck.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Renderer executable substituted for `{renderer}`.
    #[arg(long, value_name = "PATH")]
    renderer: Option<PathBuf>,
    /// When to keep per-test working directories.
    #[arg(long, value_enum, value_name = "POLICY")]
    retain: Option<RetainArg>,
    /// Parent directory for per-test working directories.
    #[arg(long, value_name = "DIR")]
    scratch: Option<PathBuf>,
    /// Write the suite report as canonical JSON to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Append JSON-lines lifecycle events to this path.
    #[arg(long, value_name = "PATH")]
    event_log: Option<PathBuf>,
    /// Log lifecycle events to stderr.
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Arguments for `list`.
#[derive(Args, Debug)]
struct ListCommand {
    /// Suite root containing test directories.
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,
    /// Only list tests whose name matches this regular expression.
    #[arg(long, value_name = "PATTERN")]
    filter: Option<String>,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to rendercheck.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Working directory retention accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RetainArg {
    /// Always delete.
    Never,
    /// Keep only failing tests' directories.
    OnFailure,
    /// Always keep.
    Always,
}

impl From<RetainArg> for RetentionPolicy {
    fn from(value: RetainArg) -> Self {
        match value {
            RetainArg::Never => Self::Never,
            RetainArg::OnFailure => Self::OnFailure,
            RetainArg::Always => Self::Always,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
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

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(command).await,
        Commands::List(command) => command_list(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let mut config = HarnessConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    apply_run_overrides(&mut config, &command);
    config.validate().map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;

    let filter = compile_filter(command.filter.as_deref())?;
    let options = config.suite_options(filter);
    let events = build_event_sink(config.harness.event_log.as_deref(), command.verbose)?;

    let runner = TestRunner::new(
        Arc::new(ShellCommandExecutor::new()),
        Arc::new(ImageArtifactLoader::new()),
        Arc::clone(&events),
        options.runner.clone(),
    );
    let orchestrator = SuiteOrchestrator::new(options, Arc::new(runner), events);
    let report = orchestrator
        .run_all(&command.root)
        .await
        .map_err(|err| CliError::new(t!("run.suite_failed", error = err)))?;

    print_report(&report, &command.root)?;
    if let Some(path) = &command.report {
        write_report(&report, path)?;
    }
    Ok(ExitCode::from(report.exit_code()))
}

/// Layers `run` flags over the loaded configuration.
fn apply_run_overrides(config: &mut HarnessConfig, command: &RunCommand) {
    if let Some(renderer) = &command.renderer {
        config.harness.renderer = Some(renderer.clone());
    }
    if let Some(jobs) = command.jobs {
        config.harness.jobs = usize::try_from(jobs).ok();
    }
    if let Some(timeout) = command.timeout {
        config.harness.timeout_secs = timeout;
    }
    if let Some(retain) = command.retain {
        config.harness.retain_workdirs = retain.into();
    }
    if let Some(scratch) = &command.scratch {
        config.harness.scratch_root = Some(scratch.clone());
    }
    if let Some(event_log) = &command.event_log {
        config.harness.event_log = Some(event_log.clone());
    }
}

/// Compiles the optional test-name filter.
fn compile_filter(pattern: Option<&str>) -> CliResult<Option<Regex>> {
    pattern
        .map(|pattern| {
            Regex::new(pattern).map_err(|err| {
                CliError::new(t!("run.filter_invalid", pattern = pattern, error = err))
            })
        })
        .transpose()
}

/// Selects event sinks: a file log, stderr when verbose, both, or none.
fn build_event_sink(
    event_log: Option<&Path>,
    verbose: bool,
) -> CliResult<Arc<dyn SuiteEventSink>> {
    let mut sinks: Vec<Arc<dyn SuiteEventSink>> = Vec::new();
    if let Some(path) = event_log {
        let sink = FileEventSink::new(path).map_err(|err| {
            CliError::new(t!("run.event_log_failed", path = path.display(), error = err))
        })?;
        sinks.push(Arc::new(sink));
    }
    if verbose {
        sinks.push(Arc::new(StderrEventSink));
    }
    Ok(match sinks.len() {
        0 => Arc::new(NoopEventSink),
        1 => sinks.remove(0),
        _ => Arc::new(FanoutEventSink::new(sinks)),
    })
}

/// Prints per-test lines and the summary.
fn print_report(report: &SuiteReport, root: &Path) -> CliResult<()> {
    if report.results.is_empty() {
        write_stdout_line(&t!("run.no_tests", root = root.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    for result in &report.results {
        for line in report::result_lines(result) {
            write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    write_stdout_line(&report::summary_line(report))
        .map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes the canonical JSON report.
fn write_report(report: &SuiteReport, path: &Path) -> CliResult<()> {
    let failed = |error: String| {
        CliError::new(t!("run.report_failed", path = path.display(), error = error))
    };
    let bytes = report::canonical_json(report).map_err(|err| failed(err.to_string()))?;
    fs::write(path, bytes).map_err(|err| failed(err.to_string()))?;
    write_stdout_line(&t!("run.report_written", path = path.display()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: List Command
// ============================================================================

/// Executes the `list` command.
fn command_list(command: &ListCommand) -> CliResult<ExitCode> {
    let filter = compile_filter(command.filter.as_deref())?;
    let tests = discover(&command.root)
        .map_err(|err| CliError::new(t!("run.suite_failed", error = err)))?;
    let selected: Vec<_> = tests
        .into_iter()
        .filter(|test| filter.as_ref().is_none_or(|filter| filter.is_match(test.name.as_str())))
        .collect();
    if selected.is_empty() {
        write_stdout_line(&t!("list.none"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    for test in &selected {
        write_stdout_line(test.name.as_str())
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    write_stdout_line(&t!("list.summary", count = selected.len()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = HarnessConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let source = config.source.as_ref().map_or_else(
        || t!("config.validate.defaults"),
        |path| t!("config.validate.source", path = path.display()),
    );
    write_stdout_line(&source).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

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

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns the setup-error exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_SETUP_ERROR)
}
