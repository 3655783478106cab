//! Config command handlers.

use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary, log_info};
use config_ignore_config::{
    IgnoreEnv, ValidatedIgnoreConfig, load_ignore_config_from_path, to_pretty_json,
    to_pretty_toml,
};
use config_ignore_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

fn load_effective(
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedIgnoreConfig, ErrorEnvelope> {
    let ignore_env = IgnoreEnv::from_map(env)?;
    load_ignore_config_from_path(path, overrides_json, &ignore_env)
}

/// Validate config loading, merging, and rule compilation.
pub fn run_config_check(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let config = match load_effective(env, path, overrides_json) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config check completed", mode.no_progress);

    let rules = config.ignore.rules.len();
    let stdout = if mode.is_ndjson() {
        format_ndjson_summary(
            "ok",
            "config",
            Some(serde_json::json!({ "rules": rules })),
        )
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "rules": rules,
            "deactivated": config.ignore.deactivate,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        let mut out = String::from("status: ok\nconfig: ok\n");
        if let Some(path) = path {
            out.push_str(&format!("path: {}\n", path.to_string_lossy()));
        }
        out.push_str(&format!("rules: {rules}\n"));
        out
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

/// Show the effective config after file, overrides, and env are merged.
pub fn run_config_show(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    path: Option<&Path>,
    overrides_json: Option<&str>,
    as_toml: bool,
) -> Result<CliOutput, CliError> {
    let rendered = load_effective(env, path, overrides_json).and_then(|config| {
        let text = if as_toml {
            to_pretty_toml(&config)?
        } else {
            to_pretty_json(&config)?
        };
        Ok((config, text))
    });
    let (config, text) = match rendered {
        Ok(rendered) => rendered,
        Err(error) => return Ok(format_error_output(mode, &error)),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        format_ndjson_summary(
            "ok",
            "config",
            Some(serde_json::json!({ "effectiveConfig": config.as_ref() })),
        )
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configPath": path.map(|value| value.to_string_lossy().to_string()),
            "effectiveConfig": config.as_ref(),
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        let mut out = String::from("status: ok\nconfig:\n");
        out.push_str(&text);
        out
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}
