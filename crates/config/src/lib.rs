//! # config-ignore-config
//!
//! Configuration schema, validation, and normalization logic for the ignore
//! engine and CLI. This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, IGNORE_RULES_MAX, IgnoreConfig, IgnoreSection,
    LoggingConfig, StoresConfig, ValidatedIgnoreConfig, parse_ignore_config_json,
    parse_ignore_config_toml,
};

pub use env::{
    ENV_ACTIVE_DIR, ENV_IGNORE_DEACTIVATE, ENV_IGNORE_RULES, ENV_LOG_LEVEL, ENV_SYNC_DIR,
    EnvParseError, IgnoreEnv, apply_env_overrides,
};
pub use load::{
    load_ignore_config_from_path, load_ignore_config_from_sources, load_ignore_config_std_env,
    to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
