//! Ignore settings and ruleset construction.

use config_ignore_domain::{Ruleset, compile_rules};
use config_ignore_ports::{RuleAlterHook, apply_rule_hooks};
use config_ignore_shared::{ErrorEnvelope, Result};
use std::fmt;
use std::sync::Arc;

/// Deployment settings every transform and read-time query starts from.
#[derive(Clone, Default)]
pub struct IgnoreSettings {
    /// Raw rules in authoring order.
    pub rules: Vec<String>,
    /// Kill switch; when set nothing is ever ignored.
    pub deactivated: bool,
    /// Hooks applied, in order, to a copy of `rules` before compilation.
    pub hooks: Vec<Arc<dyn RuleAlterHook>>,
}

impl IgnoreSettings {
    /// Settings with the given rules, active and without hooks.
    #[must_use]
    pub fn with_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Register a rule-alter hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn RuleAlterHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set the kill switch.
    #[must_use]
    pub const fn deactivate(mut self, deactivated: bool) -> Self {
        self.deactivated = deactivated;
        self
    }

    /// Rules after every hook has run.
    #[must_use]
    pub fn effective_rules(&self) -> Vec<String> {
        apply_rule_hooks(&self.rules, &self.hooks)
    }

    /// Compile a fresh ruleset from the effective rules.
    ///
    /// Rulesets are rebuilt for every operation so hook and settings changes
    /// are always observed.
    pub fn compile(&self) -> Result<Ruleset> {
        let rules = self.effective_rules();
        compile_rules(&rules).map_err(ErrorEnvelope::from)
    }
}

impl fmt::Debug for IgnoreSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = self.hooks.iter().map(|hook| hook.name()).collect();
        formatter
            .debug_struct("IgnoreSettings")
            .field("rules", &self.rules)
            .field("deactivated", &self.deactivated)
            .field("hooks", &hooks)
            .finish()
    }
}
