//! CLI entry point for the record-filter service.
//!
//! Watches an input folder for `<customer>_<recordtype>_<date>.csv` files
//! and splits their records into per-group output files according to the
//! configured actions.
//!
//! # Usage
//!
//! ```bash
//! record-filter [OPTIONS] [COMMAND]
//!
//! # Watch the input folder until SIGINT/SIGTERM
//! record-filter --config record-filter.json run
//!
//! # Process the files present now, then exit
//! record-filter --config record-filter.json once --json
//!
//! # Validate the configuration and list the actions
//! record-filter --config record-filter.json check
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use rf_core::Config;
use rf_rules::{Condition, StatsSnapshot};
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Record filter service.
///
/// Reads delimited record files as they arrive in the input folder and
/// writes the records each configured action selects to its own output file.
#[derive(Parser)]
#[command(name = "record-filter", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute (defaults to `run`).
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the JSON configuration file.
    #[arg(
        short,
        long,
        global = true,
        env = "RF_CONFIG",
        default_value = "record-filter.json"
    )]
    config: Utf8PathBuf,

    /// Input folder (overrides `inputFolder`).
    #[arg(long, global = true, env = "RF_INPUT")]
    input: Option<Utf8PathBuf>,

    /// Output folder (overrides `outputFolder`).
    #[arg(long, global = true, env = "RF_OUTPUT")]
    output: Option<Utf8PathBuf>,

    /// Log folder for the daily log file (overrides `logFolder`).
    #[arg(long, global = true, env = "RF_LOG")]
    log: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Watch the input folder until SIGINT/SIGTERM.
    Run,

    /// Process the files currently in the input folder, then exit.
    Once {
        /// Print the final counters as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and print the resolved actions.
    Check,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Log file name inside the log folder; rolled daily.
const LOG_FILE_NAME: &str = "record-filter.log";

/// Builds the log filter.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose`,
/// `info` by default, and keeps `notify` at `warn`.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn"))
    })
}

/// Initializes the tracing subscriber: console output, plus a daily-rolled
/// file in `log_folder` when one is configured.
///
/// The returned guard flushes the file writer when dropped and must live
/// until the process exits.
fn init_tracing(
    verbose: bool,
    no_color: bool,
    log_folder: Option<&Utf8Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    let mut guard = None;
    let file_layer = log_folder.map(|folder| {
        let appender = tracing_appender::rolling::daily(folder, LOG_FILE_NAME);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(env_filter(verbose))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_filter(env_filter(verbose)),
        )
        .init();

    guard
}

/// Loads the configuration file and applies command-line overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = Config::load(&cli.config).map_err(|e| {
        color_eyre::eyre::eyre!("Failed to load configuration {}: {}", cli.config, e)
    })?;

    if let Some(input) = &cli.input {
        config.input_folder.clone_from(input);
    }
    if let Some(output) = &cli.output {
        config.output_folder.clone_from(output);
    }
    if let Some(log) = &cli.log {
        config.log_folder = Some(log.clone());
    }

    Ok(config)
}

/// Resolves when SIGINT or (on Unix) SIGTERM is received.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C, shutting down");
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs the service until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the service fails to start.
async fn run_service(config: Config) -> color_eyre::Result<()> {
    let snapshot = rf_service::run(config, shutdown_signal())
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{e:#}"))?;
    info!(
        files = snapshot.files_started,
        records = snapshot.records_evaluated,
        "Record filter stopped"
    );
    Ok(())
}

/// Processes the files present now and prints the counters.
///
/// # Errors
///
/// Returns an error if processing cannot start or output fails.
async fn run_once(config: Config, json: bool) -> color_eyre::Result<()> {
    let snapshot = rf_service::run_once(config)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("{e:#}"))?;

    if json {
        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{content}")?;
    } else {
        print_stats_summary(&snapshot);
    }
    Ok(())
}

/// Validates the configuration and prints the action list.
///
/// # Errors
///
/// Returns an error if the configuration or any action is invalid.
fn run_check(config: &Config) -> color_eyre::Result<()> {
    let processor = rf_service::check(config).map_err(|e| color_eyre::eyre::eyre!("{e:#}"))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "Configuration OK")?;
    writeln!(handle, "  Input:  {}", config.input_folder)?;
    writeln!(handle, "  Output: {}", config.output_folder)?;
    if let Some(log) = &config.log_folder {
        writeln!(handle, "  Logs:   {log}")?;
    }
    writeln!(handle)?;
    writeln!(handle, "Actions ({}):", processor.actions().len())?;

    for (action, settings) in processor.actions().iter().zip(&config.actions) {
        writeln!(
            handle,
            "  {} '{}' customers [{}] record types [{}]",
            action.kind(),
            action.group_name(),
            list_or_any(&settings.customers()),
            list_or_any(&settings.record_types()),
        )?;
        for condition in action.conditions() {
            let scope = if condition.is_stateful() {
                " (resets per input file)"
            } else {
                ""
            };
            writeln!(handle, "    - {}{scope}", describe(condition))?;
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn list_or_any(values: &[&str]) -> String {
    if values.is_empty() {
        "any".to_owned()
    } else {
        values.join(", ")
    }
}

/// One-line description of a condition.
fn describe(condition: &Condition) -> String {
    match condition {
        Condition::AllInclusive => "allInclusive".to_owned(),
        Condition::Allowed { field, values } => {
            let mut values: Vec<&str> = values.iter().map(String::as_str).collect();
            values.sort_unstable();
            format!("isAllowed {field} in [{}]", values.join(", "))
        }
        Condition::Ranged { field, start, end } => {
            format!("isInRange {field} in {start}..={end}")
        }
        Condition::Duplicate(detector) => {
            format!("isDuplicate on [{}]", detector.fields().join(", "))
        }
    }
}

/// Prints a summary of processing counters.
fn print_stats_summary(stats: &StatsSnapshot) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Processing Summary");
    let _ = writeln!(handle, "==================");
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Files processed:   {}", stats.files_started);
    let _ = writeln!(handle, "Files skipped:     {}", stats.files_failed);
    let _ = writeln!(handle, "Records evaluated: {}", stats.records_evaluated);
    let _ = writeln!(handle, "Records written:   {}", stats.records_forwarded);
    let _ = writeln!(handle, "Malformed lines:   {}", stats.malformed_lines);
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments and load the configuration
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    // 3. Initialize tracing; the guard keeps the log file writer alive
    let _log_guard = init_tracing(cli.verbose, cli.no_color, config.log_folder.as_deref());

    // 4. Route to appropriate command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_service(config).await,
        Commands::Once { json } => run_once(config, json).await,
        Commands::Check => run_check(&config),
    }
}
