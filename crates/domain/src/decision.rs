//! Ignore decisions for concrete object names.

use crate::primitives::{ConfigName, KeyPath};
use crate::rules::Ruleset;
use serde::Serialize;
use std::collections::BTreeMap;

/// What a ruleset says about one object name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "keys", rename_all = "snake_case")]
pub enum IgnoreDecision {
    /// No rule applies, or the name is an exception.
    NotIgnored,
    /// The entire object is protected.
    Whole,
    /// Only these nested keys are protected, in rule order without duplicates.
    Keyed(Vec<KeyPath>),
}

impl IgnoreDecision {
    /// Returns true for anything other than [`IgnoreDecision::NotIgnored`].
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        !matches!(self, Self::NotIgnored)
    }

    /// Stable label for reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotIgnored => "not_ignored",
            Self::Whole => "whole",
            Self::Keyed(_) => "keyed",
        }
    }
}

/// Ignored names of one store mapped to their decision.
///
/// Names that resolve to [`IgnoreDecision::NotIgnored`] are absent.
pub type IgnoreDecisions = BTreeMap<ConfigName, IgnoreDecision>;

impl Ruleset {
    /// Decide a single name.
    ///
    /// Patterns are evaluated in order. A whole-object match wins immediately
    /// and discards keys gathered so far; keyed matches accumulate.
    #[must_use]
    pub fn decide(&self, name: &str) -> IgnoreDecision {
        if self.is_exception(name) {
            return IgnoreDecision::NotIgnored;
        }

        let mut keys: Vec<KeyPath> = Vec::new();
        for pattern in &self.patterns {
            if !pattern.name.matches(name) {
                continue;
            }
            match &pattern.key_path {
                None => return IgnoreDecision::Whole,
                Some(path) => {
                    if !keys.contains(path) {
                        keys.push(path.clone());
                    }
                },
            }
        }

        if keys.is_empty() {
            IgnoreDecision::NotIgnored
        } else {
            IgnoreDecision::Keyed(keys)
        }
    }
}

/// Resolve decisions for every name in a store's name set.
pub fn resolve_names<'a, I>(ruleset: &Ruleset, names: I) -> IgnoreDecisions
where
    I: IntoIterator<Item = &'a ConfigName>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let decision = ruleset.decide(name.as_str());
            decision.is_ignored().then(|| (name.clone(), decision))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::compile_rules;
    use config_ignore_shared::ErrorEnvelope;

    fn names(raw: &[&str]) -> Result<Vec<ConfigName>, ErrorEnvelope> {
        raw.iter()
            .map(|name| ConfigName::parse(name).map_err(ErrorEnvelope::from))
            .collect()
    }

    #[test]
    fn whole_match_supersedes_keys_in_any_order() -> Result<(), ErrorEnvelope> {
        let keyed_first = compile_rules(["system.site:name", "system.*"])?;
        let whole_first = compile_rules(["system.*", "system.site:name"])?;
        assert_eq!(keyed_first.decide("system.site"), IgnoreDecision::Whole);
        assert_eq!(whole_first.decide("system.site"), IgnoreDecision::Whole);
        Ok(())
    }

    #[test]
    fn keyed_matches_accumulate_without_duplicates() -> Result<(), ErrorEnvelope> {
        let ruleset = compile_rules([
            "system.site:name",
            "system.*:slogan",
            "system.site:name",
        ])?;
        assert_eq!(
            ruleset.decide("system.site"),
            IgnoreDecision::Keyed(vec![KeyPath::parse("name")?, KeyPath::parse("slogan")?])
        );
        Ok(())
    }

    #[test]
    fn exceptions_always_win() -> Result<(), ErrorEnvelope> {
        let ruleset = compile_rules(["system.*", "~system.site"])?;
        assert_eq!(ruleset.decide("system.site"), IgnoreDecision::NotIgnored);
        assert_eq!(ruleset.decide("system.menu"), IgnoreDecision::Whole);
        Ok(())
    }

    #[test]
    fn resolve_names_omits_unignored() -> Result<(), ErrorEnvelope> {
        let ruleset = compile_rules(["system.*", "~system.site", "views.view.*:status"])?;
        let store_names = names(&["system.site", "system.menu", "views.view.frontpage", "node.type"])?;
        let decisions = resolve_names(&ruleset, &store_names);

        let resolved: Vec<_> = decisions
            .iter()
            .map(|(name, decision)| (name.as_str(), decision.label()))
            .collect();
        assert_eq!(
            resolved,
            [("system.menu", "whole"), ("views.view.frontpage", "keyed")]
        );
        Ok(())
    }

    #[test]
    fn empty_ruleset_ignores_nothing() -> Result<(), ErrorEnvelope> {
        let ruleset = compile_rules(Vec::<String>::new())?;
        let store_names = names(&["system.site"])?;
        assert!(resolve_names(&ruleset, &store_names).is_empty());
        Ok(())
    }
}
