//! Rule compilation.
//!
//! Grammar of a single rule: `["~"] name ["*"] [":" dotted.key.path]`.
//!
//! - `~name` is an exception: an exact object name that is never ignored.
//! - `name` (optionally wildcarded) ignores the whole object.
//! - `name:key.path` ignores a single nested key of matching objects.

use crate::matcher::{NamePattern, WILDCARD};
use crate::primitives::KeyPath;
use config_ignore_shared::{ErrorCode, ErrorEnvelope};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Prefix marking an exception rule.
pub const EXCEPTION_MARKER: char = '~';
/// Separator between the name pattern and the key path.
pub const KEY_SEPARATOR: char = ':';

/// Why a rule is self-contradictory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// An exception names a wildcard pattern.
    WildcardException,
    /// A key path contains a wildcard.
    WildcardKeyPath,
}

impl ConflictKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::WildcardException => "wildcard_exception",
            Self::WildcardKeyPath => "wildcard_key_path",
        }
    }
}

/// Rule authoring mistakes detected at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The rule combines features that cannot be combined.
    Conflict {
        /// Raw rule as authored.
        rule: String,
        /// Which combination was rejected.
        kind: ConflictKind,
    },
    /// The key path after `:` is empty or has empty segments.
    InvalidKeyPath {
        /// Raw rule as authored.
        rule: String,
    },
    /// `~` with nothing after it.
    EmptyException {
        /// Raw rule as authored.
        rule: String,
    },
    /// The name part is empty or not a valid object name.
    InvalidName {
        /// Raw rule as authored.
        rule: String,
    },
}

impl RuleError {
    /// Raw rule that failed to compile.
    #[must_use]
    pub fn rule(&self) -> &str {
        match self {
            Self::Conflict { rule, .. }
            | Self::InvalidKeyPath { rule }
            | Self::EmptyException { rule }
            | Self::InvalidName { rule } => rule,
        }
    }

    /// Returns true for wildcard conflicts.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Conflict { .. } => ErrorCode::new("rules", "rule_conflict"),
            Self::InvalidKeyPath { .. } => ErrorCode::new("rules", "invalid_key_path"),
            Self::EmptyException { .. } => ErrorCode::new("rules", "empty_exception"),
            Self::InvalidName { .. } => ErrorCode::new("rules", "invalid_name"),
        }
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict {
                rule,
                kind: ConflictKind::WildcardException,
            } => write!(
                formatter,
                "rule `{rule}` is an exception and must not contain a wildcard"
            ),
            Self::Conflict {
                rule,
                kind: ConflictKind::WildcardKeyPath,
            } => write!(
                formatter,
                "rule `{rule}` has a key path and key paths must not contain a wildcard"
            ),
            Self::InvalidKeyPath { rule } => {
                write!(formatter, "rule `{rule}` has an empty or malformed key path")
            },
            Self::EmptyException { rule } => {
                write!(formatter, "rule `{rule}` is an exception without a name")
            },
            Self::InvalidName { rule } => {
                write!(formatter, "rule `{rule}` does not name a configuration object")
            },
        }
    }
}

impl std::error::Error for RuleError {}

impl From<RuleError> for ErrorEnvelope {
    fn from(error: RuleError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            RuleError::Conflict { rule, kind } => envelope
                .with_metadata("rule", rule)
                .with_metadata("conflict", kind.as_str()),
            RuleError::InvalidKeyPath { rule }
            | RuleError::EmptyException { rule }
            | RuleError::InvalidName { rule } => envelope.with_metadata("rule", rule),
        }
    }
}

/// One compiled ignore rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulePattern {
    /// Object-name pattern.
    pub name: NamePattern,
    /// Nested key to ignore; `None` ignores the whole object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<KeyPath>,
}

impl RulePattern {
    /// Returns true when the rule ignores the whole object.
    #[must_use]
    pub const fn is_whole(&self) -> bool {
        self.key_path.is_none()
    }
}

impl fmt::Display for RulePattern {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key_path {
            Some(path) => write!(formatter, "{}{KEY_SEPARATOR}{path}", self.name),
            None => write!(formatter, "{}", self.name),
        }
    }
}

/// Compiled rule list: ordered patterns plus exact-name exceptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ruleset {
    /// Patterns in authoring order.
    pub patterns: Vec<RulePattern>,
    /// Names that are never ignored. Kept verbatim, so an entry that is not a
    /// valid object name simply never matches.
    pub exceptions: BTreeSet<String>,
}

impl Ruleset {
    /// Returns true when no rule can ignore anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true when `name` is listed as an exception.
    #[must_use]
    pub fn is_exception(&self, name: &str) -> bool {
        self.exceptions.contains(name)
    }
}

/// Compile an ordered list of raw rules.
///
/// Entries are trimmed and blank entries are skipped. The first invalid rule
/// aborts compilation.
pub fn compile_rules<I, S>(raw_rules: I) -> Result<Ruleset, RuleError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ruleset = Ruleset::default();
    for raw in raw_rules {
        match compile_rule(raw.as_ref())? {
            Some(CompiledRule::Exception(name)) => {
                ruleset.exceptions.insert(name);
            },
            Some(CompiledRule::Pattern(pattern)) => ruleset.patterns.push(pattern),
            None => {},
        }
    }
    Ok(ruleset)
}

/// A single compiled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledRule {
    /// Exact name excluded from every ignore decision.
    Exception(String),
    /// Ignore pattern.
    Pattern(RulePattern),
}

/// Compile one raw rule; blank input yields `Ok(None)`.
pub fn compile_rule(raw: &str) -> Result<Option<CompiledRule>, RuleError> {
    let rule = raw.trim();
    if rule.is_empty() {
        return Ok(None);
    }

    if let Some(remainder) = rule.strip_prefix(EXCEPTION_MARKER) {
        let remainder = remainder.trim();
        if remainder.is_empty() {
            return Err(RuleError::EmptyException {
                rule: rule.to_owned(),
            });
        }
        if NamePattern::new(remainder).has_wildcard() {
            return Err(RuleError::Conflict {
                rule: rule.to_owned(),
                kind: ConflictKind::WildcardException,
            });
        }
        return Ok(Some(CompiledRule::Exception(remainder.to_owned())));
    }

    let (name, key_path) = match rule.split_once(KEY_SEPARATOR) {
        Some((name, key_path)) => (name.trim(), Some(key_path.trim())),
        None => (rule, None),
    };

    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(RuleError::InvalidName {
            rule: rule.to_owned(),
        });
    }

    let key_path = match key_path {
        None => None,
        Some(path) if path.contains(WILDCARD) => {
            return Err(RuleError::Conflict {
                rule: rule.to_owned(),
                kind: ConflictKind::WildcardKeyPath,
            });
        },
        Some(path) => Some(KeyPath::parse(path).map_err(|_| RuleError::InvalidKeyPath {
            rule: rule.to_owned(),
        })?),
    };

    Ok(Some(CompiledRule::Pattern(RulePattern {
        name: NamePattern::new(name),
        key_path,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_whole_keyed_and_exception_rules() -> Result<(), RuleError> {
        let ruleset = compile_rules(["system.*", "system.site:page.front", "~system.menu"])?;
        assert_eq!(ruleset.patterns.len(), 2);
        assert!(ruleset.patterns.first().is_some_and(RulePattern::is_whole));
        assert_eq!(
            ruleset.patterns.get(1).map(ToString::to_string),
            Some("system.site:page.front".to_owned())
        );
        assert!(ruleset.is_exception("system.menu"));
        Ok(())
    }

    #[test]
    fn preserves_authoring_order() -> Result<(), RuleError> {
        let ruleset = compile_rules(["b.*", "a.*", "c"])?;
        let names: Vec<_> = ruleset
            .patterns
            .iter()
            .map(|pattern| pattern.name.as_str())
            .collect();
        assert_eq!(names, ["b.*", "a.*", "c"]);
        Ok(())
    }

    #[test]
    fn skips_blank_entries_and_trims() -> Result<(), RuleError> {
        let ruleset = compile_rules(["", "   ", "  system.site  "])?;
        assert_eq!(ruleset.patterns.len(), 1);
        assert_eq!(
            ruleset.patterns.first().map(|pattern| pattern.name.as_str()),
            Some("system.site")
        );
        Ok(())
    }

    #[test]
    fn exception_with_key_suffix_is_kept_verbatim() -> Result<(), RuleError> {
        let ruleset = compile_rules(["system.*", "~system.site:name"])?;
        assert_eq!(ruleset.patterns.len(), 1);
        assert!(ruleset.is_exception("system.site:name"));
        assert!(!ruleset.is_exception("system.site"));
        assert_eq!(ruleset.decide("system.site"), crate::IgnoreDecision::Whole);
        Ok(())
    }

    #[test]
    fn wildcard_exception_is_conflict() {
        let result = compile_rules(["~system.*"]);
        assert_eq!(
            result,
            Err(RuleError::Conflict {
                rule: "~system.*".to_owned(),
                kind: ConflictKind::WildcardException,
            })
        );
    }

    #[test]
    fn wildcard_key_path_is_conflict() -> Result<(), String> {
        let Err(error) = compile_rules(["system.site:page.*"]) else {
            return Err("expected a conflict".to_owned());
        };
        assert!(error.is_conflict());
        assert_eq!(error.rule(), "system.site:page.*");
        Ok(())
    }

    #[test]
    fn malformed_rules_are_rejected() {
        assert!(matches!(
            compile_rules(["~"]),
            Err(RuleError::EmptyException { .. })
        ));
        assert!(matches!(
            compile_rules(["system.site:"]),
            Err(RuleError::InvalidKeyPath { .. })
        ));
        assert!(matches!(
            compile_rules(["system.site:a..b"]),
            Err(RuleError::InvalidKeyPath { .. })
        ));
        assert!(matches!(
            compile_rules([":name"]),
            Err(RuleError::InvalidName { .. })
        ));
    }

    #[test]
    fn conflict_maps_to_rule_conflict_code() {
        let envelope: ErrorEnvelope = RuleError::Conflict {
            rule: "~a*".to_owned(),
            kind: ConflictKind::WildcardException,
        }
        .into();
        assert!(envelope.has_code("rules", "rule_conflict"));
        assert_eq!(envelope.metadata.get("rule").map(String::as_str), Some("~a*"));
        assert_eq!(
            envelope.metadata.get("conflict").map(String::as_str),
            Some("wildcard_exception")
        );
    }
}
