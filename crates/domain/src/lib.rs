//! # config-ignore-domain
//!
//! Pure ignore-rule logic shared by the bulk transform and the read-time
//! filter:
//!
//! - **Primitives** - `ConfigName`, `CollectionId`, `KeyPath`, `SyncDirection`
//! - **Matcher** - full-string `*` globbing over object names
//! - **Rules** - compilation of raw rule strings into a `Ruleset`
//! - **Decision** - per-name `IgnoreDecision` resolution
//! - **Tree** - key-path access into nested configuration values
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use config_ignore_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod decision;
pub mod matcher;
pub mod primitives;
pub mod rules;
pub mod tree;

pub use decision::{IgnoreDecision, IgnoreDecisions, resolve_names};
pub use matcher::{NamePattern, WILDCARD, matches};
pub use primitives::{
    CollectionId, ConfigName, KeyPath, MAX_CONFIG_NAME_LENGTH, PrimitiveError, SyncDirection,
};
pub use rules::{
    CompiledRule, ConflictKind, EXCEPTION_MARKER, KEY_SEPARATOR, RuleError, RulePattern, Ruleset,
    compile_rule, compile_rules,
};
pub use tree::{ConfigTree, get_path, has_path, remove_path, set_path};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================
