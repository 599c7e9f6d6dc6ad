//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use drt_harness::core::config::Config;
use drt_harness::core::errors::HarnessError;
use drt_harness::harness::outcome::Verdict;
use drt_harness::harness::suite::{ScenarioFilter, Suite, SuiteReport};
use drt_harness::interrupt::InterruptFlag;
use drt_harness::logger::sink::{JsonlSink, ResultSink, TeeSink};
use drt_harness::manifest::Manifest;

/// Scenario-driven developer regression tests.
#[derive(Debug, Parser)]
#[command(
    name = "drt",
    author,
    version,
    about = "DRT - scenario runner for developer regression tests",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Show status lines and evidence for passing scenarios too.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (verdicts and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run scenarios from manifest files.
    Run(RunArgs),
    /// List scenarios (variations expanded) without running them.
    List(ListArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct SelectionArgs {
    /// Only scenarios with priority <= N.
    #[arg(long, value_name = "N")]
    priority: Option<u32>,
    /// Only scenarios whose area starts with this prefix.
    #[arg(long, value_name = "AREA")]
    area: Option<String>,
    /// Only scenarios whose expanded name matches this regex.
    #[arg(long, value_name = "REGEX")]
    filter: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Manifest files (TOML).
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
    #[command(flatten)]
    selection: SelectionArgs,
    /// Write the JSONL transcript to this path.
    #[arg(long, value_name = "PATH", conflicts_with = "no_log")]
    log: Option<PathBuf>,
    /// Do not write a JSONL transcript.
    #[arg(long)]
    no_log: bool,
    /// Stop the batch at the first failing scenario.
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Debug, Clone, Args)]
struct ListArgs {
    /// Manifest files (TOML).
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
    #[command(flatten)]
    selection: SelectionArgs,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration and print its hash.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input (bad manifest, bad flag values).
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// The batch ran but not every selected scenario passed.
    #[error("{failed} of {selected} scenario(s) did not pass")]
    ScenariosFailed { failed: usize, selected: usize },
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ScenariosFailed { .. } => 1,
            Self::User(_) => 2,
            Self::Runtime(_) | Self::Io(_) => 3,
            Self::Json(_) => 4,
        }
    }
}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::InvalidConfig { .. }
            | HarnessError::MissingConfig { .. }
            | HarnessError::ConfigParse { .. }
            | HarnessError::InvalidManifest { .. } => Self::User(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_scenarios(cli, args),
        Command::List(args) => run_list(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── run ────────────────────

fn run_scenarios(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    apply_selection(&mut config, &args.selection);
    if let Some(path) = &args.log {
        config.paths.jsonl_log.clone_from(path);
    }
    if args.no_log {
        config.logging.jsonl_enabled = false;
    }
    if args.fail_fast {
        config.runner.continue_after_failure = false;
    }

    let suite = load_suite(&args.files)?;
    let interrupt = InterruptFlag::install();
    let mode = output_mode(cli);

    let mut console = ConsoleSink::new(verbosity(cli), config.logging.echo_debug);
    let mut jsonl = config
        .logging
        .jsonl_enabled
        .then(|| JsonlSink::from_config(&config));

    let report = {
        let mut tee = TeeSink::new();
        if mode == OutputMode::Human {
            tee = tee.with(&mut console);
        }
        if let Some(sink) = jsonl.as_mut() {
            tee = tee.with(sink);
        }
        suite.run(&config, &mut tee, Some(interrupt.as_atomic()))?
    };
    if let Some(sink) = jsonl.as_ref() {
        let state = sink.writer().state();
        if state != "normal" && mode == OutputMode::Human {
            eprintln!("[DRT-JSONL] transcript degraded to {state}");
        }
    }

    match mode {
        OutputMode::Human => print_summary(&report, cli.quiet),
        OutputMode::Json => {
            let payload = json!({
                "command": "run",
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&payload)?;
        }
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: report.selected - report.passed,
            selected: report.selected,
        })
    }
}

fn print_summary(report: &SuiteReport, quiet: bool) {
    if quiet {
        return;
    }
    let mut line = format!(
        "{} passed, {} failed, {} selected ({}ms)",
        report.passed, report.failed, report.selected, report.duration_ms
    );
    if report.cancelled {
        line.push_str(", interrupted");
    }
    if report.stopped_early {
        line.push_str(", stopped after first failure");
    }
    if report.all_passed() {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line.red().bold());
    }
}

// ──────────────────── list ────────────────────

fn run_list(cli: &Cli, args: &ListArgs) -> Result<(), CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    apply_selection(&mut config, &args.selection);
    let filter = ScenarioFilter::from_config(&config.filter)?;
    let suite = load_suite(&args.files)?;
    let scenarios = suite.list(&filter);

    match output_mode(cli) {
        OutputMode::Human => {
            for info in &scenarios {
                let area = if info.area.is_empty() { "-" } else { &info.area };
                println!("P{}  {:<24}  {}", info.priority, area, info.name);
            }
            if !cli.quiet {
                println!("{} scenario(s)", scenarios.len());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "list",
                "scenarios": serde_json::to_value(&scenarios)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str =
                        toml::to_string_pretty(&config).map_err(HarnessError::from)?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => {
            let config = Config::load(cli.config.as_deref())?;
            let hash = config.stable_hash()?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("Configuration is valid.");
                    println!("  Source: {}", config.paths.config_file.display());
                    println!("  Hash: {hash}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config validate",
                        "valid": true,
                        "hash": hash,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ──────────────────── helpers ────────────────────

fn apply_selection(config: &mut Config, selection: &SelectionArgs) {
    if let Some(priority) = selection.priority {
        config.filter.max_priority = Some(priority);
    }
    if let Some(area) = &selection.area {
        config.filter.area = Some(area.clone());
    }
    if let Some(pattern) = &selection.filter {
        config.filter.name_pattern = Some(pattern.clone());
    }
}

fn load_suite(files: &[PathBuf]) -> Result<Suite, CliError> {
    let manifests = Manifest::load_all(files)?;
    let mut suite = Suite::new();
    for manifest in &manifests {
        manifest.register(&mut suite);
    }
    Ok(suite)
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DRT_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

// ──────────────────── console sink ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

fn verbosity(cli: &Cli) -> Verbosity {
    if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Human-readable sink.
///
/// Evidence is held until the verdict arrives and printed only for
/// scenarios that did not pass, unless running verbose.
struct ConsoleSink {
    verbosity: Verbosity,
    echo_debug: bool,
    pending: Vec<String>,
}

impl ConsoleSink {
    fn new(verbosity: Verbosity, echo_debug: bool) -> Self {
        Self {
            verbosity,
            echo_debug,
            pending: Vec::new(),
        }
    }
}

impl ResultSink for ConsoleSink {
    fn log_status(&mut self, _scenario: &str, text: &str) {
        if self.verbosity == Verbosity::Verbose {
            self.pending.push(format!("    {}", text.dimmed()));
        }
    }

    fn log_evidence(&mut self, _scenario: &str, text: &str) {
        let line = if text.ends_with("[FAIL]") {
            text.red().to_string()
        } else {
            text.to_string()
        };
        self.pending.push(format!("    {line}"));
    }

    fn log_debug(&mut self, _scenario: &str, text: &str) {
        if self.echo_debug {
            self.pending.push(format!("    {} {text}", "debug".cyan()));
        }
    }

    fn log_result(
        &mut self,
        scenario: &str,
        verdict: Verdict,
        elapsed: Duration,
        diagnostic: Option<&str>,
    ) {
        let pending = std::mem::take(&mut self.pending);
        let label = match verdict {
            Verdict::Pass => verdict.to_string().green().bold(),
            Verdict::Fail => verdict.to_string().red().bold(),
            Verdict::Exception => verdict.to_string().magenta().bold(),
        };
        println!("{label:<9} {scenario} ({}ms)", elapsed.as_millis());

        let show_trail = match self.verbosity {
            Verbosity::Quiet => false,
            Verbosity::Normal => verdict != Verdict::Pass,
            Verbosity::Verbose => true,
        };
        if show_trail {
            for line in pending {
                println!("{line}");
            }
        }
        if let Some(diagnostic) = diagnostic
            && self.verbosity != Verbosity::Quiet
        {
            println!("  {} {diagnostic}", "->".red());
        }
    }

    fn begin_batch(&mut self, config_hash: &str, scenario_count: usize) {
        if self.verbosity == Verbosity::Verbose {
            println!("running {scenario_count} scenario(s), config {config_hash}");
        }
    }
}
