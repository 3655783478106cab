//! Rule-alter hook contract.

use std::sync::Arc;

/// Extension point that edits the raw rule list before compilation.
///
/// Hooks run in registration order on a mutable copy of the configured rules
/// and may append, remove, or rewrite entries.
pub trait RuleAlterHook: Send + Sync {
    /// Stable hook identifier for logs.
    fn name(&self) -> &str;

    /// Alter the raw rule list in place.
    fn alter(&self, rules: &mut Vec<String>);
}

/// Apply `hooks` in order to a copy of `rules`.
#[must_use]
pub fn apply_rule_hooks(rules: &[String], hooks: &[Arc<dyn RuleAlterHook>]) -> Vec<String> {
    let mut altered = rules.to_vec();
    for hook in hooks {
        hook.alter(&mut altered);
    }
    altered
}
