//! Config loading helpers (env + file + overrides).
//!
//! The loader is responsible for deterministic merge order and surfacing
//! user-facing errors as typed `ErrorEnvelope`s.

use crate::{IgnoreConfig, IgnoreEnv, ValidatedIgnoreConfig, apply_env_overrides};
use config_ignore_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load the config from sources using a deterministic precedence order.
///
/// Precedence (highest wins):
/// - env overrides (`IgnoreEnv`)
/// - overrides JSON (partial config)
/// - config JSON (file content)
/// - defaults (`IgnoreConfig::default()`)
pub fn load_ignore_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &IgnoreEnv,
) -> Result<ValidatedIgnoreConfig, ErrorEnvelope> {
    let mut config = match config_json {
        None => IgnoreConfig::default(),
        Some(input) => parse_config_unvalidated(input, ConfigFormat::Json)?,
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    // env is applied last and also validates/normalizes the resulting config.
    apply_env_overrides(config, env)
}

/// Load the config from an optional file path.
pub fn load_ignore_config_from_path(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
    env: &IgnoreEnv,
) -> Result<ValidatedIgnoreConfig, ErrorEnvelope> {
    let mut config = match config_path {
        None => IgnoreConfig::default(),
        Some(path) => {
            let config_text = read_config_file(path)?;
            let format = detect_config_format(path)?;
            parse_config_unvalidated(&config_text, format)?
        },
    };

    if let Some(input) = overrides_json {
        let overrides = parse_overrides_json(input)?;
        apply_overrides(&mut config, overrides);
    }

    apply_env_overrides(config, env)
}

/// Load the config from std env and an optional file path.
pub fn load_ignore_config_std_env(
    config_path: Option<&Path>,
    overrides_json: Option<&str>,
) -> Result<ValidatedIgnoreConfig, ErrorEnvelope> {
    let env = IgnoreEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_ignore_config_from_path(config_path, overrides_json, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &IgnoreConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as deterministic pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &IgnoreConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

fn parse_config_unvalidated(
    input: &str,
    format: ConfigFormat,
) -> Result<IgnoreConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
            .with_metadata("source", "config")
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
            .with_metadata("source", "config")
        }),
    }
}

fn parse_overrides_json(input: &str) -> Result<IgnoreConfigOverrides, ErrorEnvelope> {
    serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid overrides JSON: {error}"),
        )
        .with_metadata("source", "overrides")
    })
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::new("config", "config_file_not_found"),
            std::io::ErrorKind::PermissionDenied => {
                ErrorCode::new("config", "config_file_permission_denied")
            },
            _ => ErrorCode::new("config", "config_file_io"),
        };

        ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
            .with_metadata("path", path.to_string_lossy().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct IgnoreConfigOverrides {
    version: Option<u32>,
    ignore: IgnoreSectionOverrides,
    stores: StoresConfigOverrides,
    logging: LoggingConfigOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct IgnoreSectionOverrides {
    rules: Option<Vec<String>>,
    deactivate: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct StoresConfigOverrides {
    active_dir: Option<PathBuf>,
    sync_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct LoggingConfigOverrides {
    level: Option<Box<str>>,
}

fn apply_overrides(config: &mut IgnoreConfig, overrides: IgnoreConfigOverrides) {
    let IgnoreConfigOverrides {
        version,
        ignore,
        stores,
        logging,
    } = overrides;

    set_some(&mut config.version, version);
    set_some(&mut config.ignore.rules, ignore.rules);
    set_some(&mut config.ignore.deactivate, ignore.deactivate);
    if stores.active_dir.is_some() {
        config.stores.active_dir = stores.active_dir;
    }
    if stores.sync_dir.is_some() {
        config.stores.sync_dir = stores.sync_dir;
    }
    set_some(&mut config.logging.level, logging.level);
}

fn set_some<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}
