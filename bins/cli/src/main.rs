//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{
    StoreArgs, run_config_check, run_config_show, run_export, run_import, run_status,
};
use config_ignore_shared::ErrorEnvelope;
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Env var holding the `tracing` filter directive for diagnostics.
const LOG_FILTER_ENV: &str = "CFGI_LOG";
/// Prefix of env vars read as config overrides.
const CONFIG_ENV_PREFIX: &str = "CFGI_";

#[derive(Debug, Parser)]
#[command(
    name = "cfgi",
    version,
    about = "Protect ignored configuration during config sync",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply the sync snapshot to the active store, keeping ignored config.
    Import {
        #[command(flatten)]
        store: StoreArgs,
        /// Report what would happen without writing the active store.
        #[arg(long)]
        dry_run: bool,
    },
    /// Write the active store to the sync snapshot, keeping ignored values.
    Export {
        #[command(flatten)]
        store: StoreArgs,
        /// Report what would happen without writing the sync store.
        #[arg(long)]
        dry_run: bool,
    },
    /// Compare the stores as an import would see them.
    Status {
        #[command(flatten)]
        store: StoreArgs,
        /// Also list the ignore decision of every sync object.
        #[arg(long)]
        decisions: bool,
    },
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate config loading, merging, and rule compilation.
    Check {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Show the effective config after applying overrides.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
        /// Render the text output as TOML instead of JSON.
        #[arg(long)]
        toml: bool,
    },
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);
    init_tracing(mode);

    let env = collect_scoped_env(CONFIG_ENV_PREFIX);
    match run(&cli.command, mode, &env) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(
    command: &Commands,
    mode: OutputMode,
    env: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    tracing::debug!(?command, format = ?mode.format, "dispatching command");
    match command {
        Commands::Import { store, dry_run } => run_import(mode, store, *dry_run, env),
        Commands::Export { store, dry_run } => run_export(mode, store, *dry_run, env),
        Commands::Status { store, decisions } => run_status(mode, store, *decisions, env),
        Commands::Config { command } => match command {
            ConfigCommands::Check {
                path,
                overrides_json,
            } => run_config_check(mode, env, path.as_deref(), overrides_json.as_deref()),
            ConfigCommands::Show {
                path,
                overrides_json,
                toml,
            } => run_config_show(
                mode,
                env,
                path.as_deref(),
                overrides_json.as_deref(),
                *toml,
            ),
        },
    }
}

/// Install the diagnostics subscriber; `tracing` events go to stderr.
fn init_tracing(mode: OutputMode) {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    // A second subscriber only happens in tests; keep the first.
    let _ = if mode.is_json() || mode.is_ndjson() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

pub(crate) fn format_error_output(mode: OutputMode, error: &ErrorEnvelope) -> CliOutput {
    let error = error.clone().redact_secrets();
    let exit_code = ExitCode::for_envelope(&error);

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        format_ndjson_error(&error)
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": error,
        });

        // This is a CLI boundary, so JSON serialization errors are internal.
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\"}}".to_string()
        });
        output.push('\n');
        output
    } else {
        format_error_text(&error)
    };

    CliOutput {
        stdout,
        stderr,
        exit_code,
    }
}

fn format_error_text(error: &ErrorEnvelope) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code.to_string());
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(&error.kind.to_string());
    out.push('\n');

    if !error.metadata.is_empty() {
        out.push_str("meta:\n");
        for (key, value) in &error.metadata {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    out
}

pub(crate) fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

pub(crate) fn format_ndjson_summary(
    status: &str,
    kind: &str,
    extra: Option<serde_json::Value>,
) -> String {
    let mut payload = serde_json::Map::new();
    payload.insert(
        "type".to_string(),
        serde_json::Value::String("summary".to_string()),
    );
    payload.insert(
        "status".to_string(),
        serde_json::Value::String(status.to_string()),
    );
    payload.insert(
        "kind".to_string(),
        serde_json::Value::String(kind.to_string()),
    );
    if let Some(serde_json::Value::Object(map)) = extra {
        for (key, value) in map {
            payload.insert(key, value);
        }
    }
    let mut out = serde_json::to_string(&serde_json::Value::Object(payload)).unwrap_or_else(|_| {
        "{\"type\":\"summary\",\"status\":\"error\",\"kind\":\"internal\"}".to_string()
    });
    out.push('\n');
    out
}

fn format_ndjson_error(error: &ErrorEnvelope) -> String {
    let payload = serde_json::json!({
        "type": "error",
        "status": "error",
        "error": error,
    });
    let mut out = serde_json::to_string(&payload).unwrap_or_else(|_| {
        "{\"type\":\"error\",\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\"}}".to_string()
    });
    out.push('\n');
    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

fn collect_scoped_env(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect()
}
