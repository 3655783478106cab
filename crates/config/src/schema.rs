//! Ignore configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims rule entries and drops blanks; rule order is
//!   significant and is never changed.

use config_ignore_domain::{RuleError, compile_rule};
use config_ignore_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Maximum number of ignore rules accepted from any source.
pub const IGNORE_RULES_MAX: usize = 1_024;

const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct IgnoreConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Ignore rules and the kill switch.
    pub ignore: IgnoreSection,
    /// Store locations used by the CLI.
    pub stores: StoresConfig,
    /// Structured logging settings.
    pub logging: LoggingConfig,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            ignore: IgnoreSection::default(),
            stores: StoresConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl IgnoreConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedIgnoreConfig, ConfigSchemaError> {
        self.validate_version()?;
        self.ignore.normalize_and_validate()?;
        self.stores.normalize_and_validate()?;
        self.logging.normalize_and_validate()?;
        Ok(ValidatedIgnoreConfig { raw: self })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIgnoreConfig {
    raw: IgnoreConfig,
}

impl ValidatedIgnoreConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &IgnoreConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> IgnoreConfig {
        self.raw
    }
}

impl AsRef<IgnoreConfig> for ValidatedIgnoreConfig {
    fn as_ref(&self) -> &IgnoreConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedIgnoreConfig {
    type Target = IgnoreConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a config from a JSON string, applying validation and normalization.
pub fn parse_ignore_config_json(input: &str) -> Result<ValidatedIgnoreConfig, ErrorEnvelope> {
    let config: IgnoreConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a config from a TOML string, applying validation and normalization.
pub fn parse_ignore_config_toml(input: &str) -> Result<ValidatedIgnoreConfig, ErrorEnvelope> {
    let config: IgnoreConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Ignore rules and the global kill switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct IgnoreSection {
    /// Raw rules in authoring order.
    pub rules: Vec<String>,
    /// When true every name is treated as not ignored.
    pub deactivate: bool,
}

impl IgnoreSection {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        self.rules = normalize_rules(&self.rules);

        if self.rules.len() > IGNORE_RULES_MAX {
            return Err(ConfigSchemaError::ListTooLarge {
                section: "ignore",
                field: "rules",
                len: self.rules.len(),
                max: IGNORE_RULES_MAX,
            });
        }

        for (index, rule) in self.rules.iter().enumerate() {
            compile_rule(rule).map_err(|error| ConfigSchemaError::InvalidRule { index, error })?;
        }

        Ok(())
    }
}

/// Store directories used by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct StoresConfig {
    /// Directory of the active (live) store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_dir: Option<PathBuf>,
    /// Directory of the sync (snapshot) store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_dir: Option<PathBuf>,
}

impl StoresConfig {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        validate_store_dir("activeDir", self.active_dir.as_deref())?;
        validate_store_dir("syncDir", self.sync_dir.as_deref())?;

        if let (Some(active), Some(sync)) = (&self.active_dir, &self.sync_dir) {
            if active == sync {
                return Err(ConfigSchemaError::InvalidStoreDir {
                    field: "syncDir",
                    path: sync.display().to_string(),
                    reason: "must differ from stores.activeDir",
                });
            }
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Minimum level for structured lifecycle events.
    pub level: Box<str>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl LoggingConfig {
    fn normalize_and_validate(&mut self) -> Result<(), ConfigSchemaError> {
        let normalized = self.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&normalized.as_str()) {
            return Err(ConfigSchemaError::InvalidLogLevel {
                level: self.level.to_string(),
            });
        }
        self.level = normalized.into_boxed_str();
        Ok(())
    }
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A list field exceeds the maximum allowed size.
    ListTooLarge {
        /// Schema section (e.g. `ignore`).
        section: &'static str,
        /// Field name in the config file (e.g. `rules`).
        field: &'static str,
        /// Number of entries after normalization.
        len: usize,
        /// Maximum allowed number of entries.
        max: usize,
    },
    /// An ignore rule does not compile.
    InvalidRule {
        /// Position of the rule after normalization.
        index: usize,
        /// Compilation failure.
        error: RuleError,
    },
    /// A store directory is unusable.
    InvalidStoreDir {
        /// Field name in the config file (e.g. `activeDir`).
        field: &'static str,
        /// Offending path.
        path: String,
        /// Human readable reason.
        reason: &'static str,
    },
    /// The log level is not recognised.
    InvalidLogLevel {
        /// Raw level value.
        level: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::ListTooLarge { .. } => ErrorCode::new("config", "list_too_large"),
            Self::InvalidRule { .. } => ErrorCode::new("config", "invalid_rule"),
            Self::InvalidStoreDir { .. } => ErrorCode::new("config", "invalid_store_dir"),
            Self::InvalidLogLevel { .. } => ErrorCode::new("config", "invalid_log_level"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    formatter,
                    "unsupported config version: {found} (supported: {supported})"
                )
            },
            Self::ListTooLarge {
                section,
                field,
                len,
                max,
            } => write!(
                formatter,
                "{section}.{field} must have at most {max} entries (got {len})"
            ),
            Self::InvalidRule { index, error } => {
                write!(formatter, "ignore.rules[{index}]: {error}")
            },
            Self::InvalidStoreDir { field, reason, .. } => {
                write!(formatter, "stores.{field} {reason}")
            },
            Self::InvalidLogLevel { .. } => write!(
                formatter,
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::ListTooLarge {
                section,
                field,
                len,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::InvalidRule { index, error } => {
                let rule_code = ErrorEnvelope::from(error.clone()).code.to_string();
                envelope = envelope
                    .with_metadata("index", index.to_string())
                    .with_metadata("rule", error.rule())
                    .with_metadata("rule_error", rule_code);
            },
            ConfigSchemaError::InvalidStoreDir { field, path, .. } => {
                envelope = envelope
                    .with_metadata("section", "stores")
                    .with_metadata("field", field)
                    .with_metadata("path", path);
            },
            ConfigSchemaError::InvalidLogLevel { level } => {
                envelope = envelope.with_metadata("level", level);
            },
        }

        envelope
    }
}

/// Trim entries and drop blanks, keeping authoring order.
pub(crate) fn normalize_rules(input: &[String]) -> Vec<String> {
    input
        .iter()
        .map(|rule| rule.trim())
        .filter(|rule| !rule.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn validate_store_dir(field: &'static str, path: Option<&Path>) -> Result<(), ConfigSchemaError> {
    let Some(path) = path else {
        return Ok(());
    };
    if path.as_os_str().is_empty() {
        return Err(ConfigSchemaError::InvalidStoreDir {
            field,
            path: String::new(),
            reason: "must be non-empty",
        });
    }
    Ok(())
}
