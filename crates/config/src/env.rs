//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict: a present-but-invalid value fails fast instead of
//! being silently ignored.

use crate::schema::{IgnoreConfig, ValidatedIgnoreConfig, normalize_rules};
use config_ignore_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Env var: comma-separated ignore rules (replaces configured rules).
pub const ENV_IGNORE_RULES: &str = "CFGI_IGNORE_RULES";
/// Env var: kill switch.
pub const ENV_IGNORE_DEACTIVATE: &str = "CFGI_IGNORE_DEACTIVATE";
/// Env var: active store directory.
pub const ENV_ACTIVE_DIR: &str = "CFGI_ACTIVE_DIR";
/// Env var: sync store directory.
pub const ENV_SYNC_DIR: &str = "CFGI_SYNC_DIR";
/// Env var: structured log level.
pub const ENV_LOG_LEVEL: &str = "CFGI_LOG_LEVEL";

const ALL_ENV_VARS: [&str; 5] = [
    ENV_IGNORE_RULES,
    ENV_IGNORE_DEACTIVATE,
    ENV_ACTIVE_DIR,
    ENV_SYNC_DIR,
    ENV_LOG_LEVEL,
];

const MAX_CSV_ITEMS: usize = 10_000;

/// Typed env-derived overrides for `IgnoreConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreEnv {
    /// Override for `ignore.rules`.
    pub ignore_rules: Option<Vec<String>>,
    /// Override for `ignore.deactivate`.
    pub ignore_deactivate: Option<bool>,
    /// Override for `stores.activeDir`.
    pub active_dir: Option<PathBuf>,
    /// Override for `stores.syncDir`.
    pub sync_dir: Option<PathBuf>,
    /// Override for `logging.level`.
    pub log_level: Option<Box<str>>,
}

impl IgnoreEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            ignore_rules: parse_optional_csv_rules(map, ENV_IGNORE_RULES)?,
            ignore_deactivate: parse_optional_bool(map, ENV_IGNORE_DEACTIVATE)?,
            active_dir: parse_optional_trimmed_string(map, ENV_ACTIVE_DIR)?
                .map(|value| PathBuf::from(&*value)),
            sync_dir: parse_optional_trimmed_string(map, ENV_SYNC_DIR)?
                .map(|value| PathBuf::from(&*value)),
            log_level: parse_optional_trimmed_string(map, ENV_LOG_LEVEL)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ALL_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_owned(), value);
            }
        }
        Self::from_map(&map)
    }

    /// Returns true when no override is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: IgnoreConfig,
    env: &IgnoreEnv,
) -> Result<ValidatedIgnoreConfig, ErrorEnvelope> {
    let mut config = base;
    if let Some(rules) = &env.ignore_rules {
        config.ignore.rules.clone_from(rules);
    }
    if let Some(deactivate) = env.ignore_deactivate {
        config.ignore.deactivate = deactivate;
    }
    if let Some(active_dir) = &env.active_dir {
        config.stores.active_dir = Some(active_dir.clone());
    }
    if let Some(sync_dir) = &env.sync_dir {
        config.stores.sync_dir = Some(sync_dir.clone());
    }
    if let Some(level) = &env.log_level {
        config.logging.level.clone_from(level);
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// CSV list exceeds a safety limit.
    CsvTooLarge {
        /// Env var name.
        var: &'static str,
        /// Number of parsed items.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::CsvTooLarge { .. } => ErrorCode::new("config", "invalid_env_csv"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::CsvTooLarge { var, len, max } => {
                write!(formatter, "{var} is too large ({len} items, max {max})")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } => {
                envelope = envelope.with_metadata("env_var", var);
            },
            EnvParseError::InvalidBool { var, value } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_if_secret(var, &value));
            },
            EnvParseError::CsvTooLarge { var, len, max } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
        }

        envelope
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

/// An empty value clears the rule list; rule order is kept as written.
fn parse_optional_csv_rules(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Vec<String>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let rules = normalize_rules(&parse_csv(raw));
    if rules.len() > MAX_CSV_ITEMS {
        return Err(EnvParseError::CsvTooLarge {
            var,
            len: rules.len(),
            max: MAX_CSV_ITEMS,
        });
    }
    Ok(Some(rules))
}

fn parse_csv(input: &str) -> Vec<String> {
    input.split(',').map(ToOwned::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn env_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn missing_vars_produce_empty_overrides() -> Result<(), Box<dyn Error>> {
        let env = IgnoreEnv::from_map(&BTreeMap::new())?;
        assert!(env.is_empty());
        Ok(())
    }

    #[test]
    fn csv_rules_keep_order_and_drop_blanks() -> Result<(), Box<dyn Error>> {
        let map = env_map(&[(ENV_IGNORE_RULES, " system.* , ,~system.site,node.type.*:name ")]);
        let env = IgnoreEnv::from_map(&map)?;
        assert_eq!(
            env.ignore_rules.as_deref(),
            Some(
                &[
                    "system.*".to_owned(),
                    "~system.site".to_owned(),
                    "node.type.*:name".to_owned()
                ][..]
            )
        );
        Ok(())
    }

    #[test]
    fn empty_rules_var_clears_rules() -> Result<(), Box<dyn Error>> {
        let map = env_map(&[(ENV_IGNORE_RULES, "")]);
        let env = IgnoreEnv::from_map(&map)?;
        assert_eq!(env.ignore_rules, Some(Vec::new()));
        Ok(())
    }

    #[test]
    fn invalid_bool_is_reported_with_value() -> Result<(), Box<dyn Error>> {
        let map = env_map(&[(ENV_IGNORE_DEACTIVATE, "maybe")]);
        let envelope: ErrorEnvelope = IgnoreEnv::from_map(&map)
            .err()
            .ok_or_else(|| std::io::Error::other("expected bool error"))?
            .into();

        assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_bool"));
        assert_eq!(
            envelope.metadata.get("value").map(String::as_str),
            Some("maybe")
        );
        Ok(())
    }

    #[test]
    fn empty_directory_var_fails_fast() {
        let map = env_map(&[(ENV_ACTIVE_DIR, "  ")]);
        assert_eq!(
            IgnoreEnv::from_map(&map),
            Err(EnvParseError::EmptyValue {
                var: ENV_ACTIVE_DIR
            })
        );
    }

    #[test]
    fn env_overrides_replace_config_values() -> Result<(), Box<dyn Error>> {
        let mut base = IgnoreConfig::default();
        base.ignore.rules = vec!["from.file".to_owned()];

        let env = IgnoreEnv {
            ignore_rules: Some(vec!["from.env".to_owned()]),
            ignore_deactivate: Some(true),
            ..IgnoreEnv::default()
        };
        let config = apply_env_overrides(base, &env)?;
        assert_eq!(config.ignore.rules, ["from.env"]);
        assert!(config.ignore.deactivate);
        Ok(())
    }
}
