//! Output format helpers for CLI commands.

use clap::{Args, ValueEnum};

/// Output format choices for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    Text,
    /// Machine-friendly JSON output.
    Json,
    /// Line-delimited JSON (NDJSON) output.
    Ndjson,
}

/// Output-related CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format for command responses.
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,
    /// Emit machine-friendly defaults (NDJSON output, no progress logs).
    #[arg(long, global = true)]
    pub agent: bool,
    /// Suppress progress and structured log output on stderr.
    #[arg(long, global = true)]
    pub no_progress: bool,
}

/// Output mode derived from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub format: OutputFormat,
    pub no_progress: bool,
}

impl OutputMode {
    /// Build output mode from CLI flags.
    #[must_use]
    pub const fn from_args(args: &OutputArgs) -> Self {
        let format = match (args.output, args.agent) {
            (Some(value), _) => value,
            (None, true) => OutputFormat::Ndjson,
            (None, false) => OutputFormat::Text,
        };

        Self {
            format,
            no_progress: args.agent || args.no_progress,
        }
    }

    /// Returns true when JSON output is requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Returns true when NDJSON output is requested.
    #[must_use]
    pub const fn is_ndjson(self) -> bool {
        matches!(self.format, OutputFormat::Ndjson)
    }
}
