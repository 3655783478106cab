//! Read-time ignore filter.
//!
//! Answers single-name questions ("is this ignored", "what would a read show
//! after import") without mutating any store, applying the same semantics as
//! one object's worth of [`crate::reconcile`].

use crate::reconcile::merge_keys;
use crate::settings::IgnoreSettings;
use config_ignore_domain::{
    CollectionId, ConfigName, ConfigTree, IgnoreDecision, Ruleset, remove_path,
};
use config_ignore_ports::ConfigStore;
use config_ignore_shared::{Result, ResultExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Non-mutating ignore filter bound to one collection of an authority store.
pub struct ReadFilter {
    authority: Box<dyn ConfigStore>,
    ruleset: Arc<Ruleset>,
    deactivated: bool,
}

impl ReadFilter {
    /// Build a filter from the current settings.
    ///
    /// When the kill switch is set the rules are not compiled and every
    /// answer is "not ignored".
    pub fn new(authority: &dyn ConfigStore, settings: &IgnoreSettings) -> Result<Self> {
        if settings.deactivated {
            return Ok(Self::deactivated(authority));
        }
        let ruleset = settings.compile()?;
        Ok(Self::with_ruleset(authority, Arc::new(ruleset)))
    }

    /// Build a filter around an already compiled ruleset.
    #[must_use]
    pub fn with_ruleset(authority: &dyn ConfigStore, ruleset: Arc<Ruleset>) -> Self {
        Self {
            authority: authority.scoped(authority.collection()),
            ruleset,
            deactivated: false,
        }
    }

    /// Filter that never ignores anything.
    #[must_use]
    pub fn deactivated(authority: &dyn ConfigStore) -> Self {
        Self {
            authority: authority.scoped(authority.collection()),
            ruleset: Arc::new(Ruleset::default()),
            deactivated: true,
        }
    }

    /// Same rules against another collection of the authority store.
    #[must_use]
    pub fn scoped(&self, collection: &CollectionId) -> Self {
        Self {
            authority: self.authority.scoped(collection),
            ruleset: Arc::clone(&self.ruleset),
            deactivated: self.deactivated,
        }
    }

    /// Collection this filter answers for.
    #[must_use]
    pub fn collection(&self) -> &CollectionId {
        self.authority.collection()
    }

    /// Returns true when the kill switch is set.
    #[must_use]
    pub const fn is_deactivated(&self) -> bool {
        self.deactivated
    }

    /// Decision for `name`.
    #[must_use]
    pub fn decision(&self, name: &ConfigName) -> IgnoreDecision {
        if self.deactivated {
            return IgnoreDecision::NotIgnored;
        }
        self.ruleset.decide(name.as_str())
    }

    /// Returns true when any rule protects `name`.
    #[must_use]
    pub fn should_ignore(&self, name: &ConfigName) -> bool {
        self.decision(name).is_ignored()
    }

    /// What a read of `name` shows once the incoming data has been reconciled.
    ///
    /// `incoming` is the raw incoming value (`None` when absent). The result
    /// is `None` when the object would not exist afterwards.
    pub fn resolve_for_read(
        &self,
        name: &ConfigName,
        incoming: Option<ConfigTree>,
    ) -> Result<Option<ConfigTree>> {
        let decision = self.decision(name);
        if !decision.is_ignored() {
            return Ok(incoming);
        }

        let authority = self
            .authority
            .read(name)
            .with_error_metadata("name", name.as_str())?;
        let resolved = match (decision, authority) {
            (IgnoreDecision::Whole, authority) => authority,
            (IgnoreDecision::Keyed(keys), Some(source)) => incoming.map(|mut data| {
                merge_keys(&mut data, &source, &keys);
                data
            }),
            (IgnoreDecision::Keyed(keys), None) => incoming.map(|mut data| {
                for key in &keys {
                    remove_path(&mut data, key);
                }
                data
            }),
            (IgnoreDecision::NotIgnored, _) => incoming,
        };
        Ok(resolved)
    }

    /// Resolve several names at once; see [`Self::resolve_for_read`].
    pub fn resolve_many_for_read(
        &self,
        incoming: BTreeMap<ConfigName, Option<ConfigTree>>,
    ) -> Result<BTreeMap<ConfigName, Option<ConfigTree>>> {
        incoming
            .into_iter()
            .map(|(name, data)| {
                let resolved = self.resolve_for_read(&name, data)?;
                Ok((name, resolved))
            })
            .collect()
    }

    /// Whether `name` exists once reconciled, given whether it exists on the
    /// incoming side.
    pub fn exists_for_read(&self, name: &ConfigName, base_exists: bool) -> Result<bool> {
        match self.decision(name) {
            IgnoreDecision::Whole => self
                .authority
                .exists(name)
                .with_error_metadata("name", name.as_str()),
            IgnoreDecision::NotIgnored | IgnoreDecision::Keyed(_) => Ok(base_exists),
        }
    }

    /// Incoming names starting with `prefix`, adjusted for whole-object
    /// ignores: protected authority objects are added and protected objects
    /// unknown to the authority are dropped. Sorted and deduplicated.
    pub fn list_names_including_ignored(
        &self,
        prefix: &str,
        base_names: Vec<ConfigName>,
    ) -> Result<Vec<ConfigName>> {
        if self.deactivated || self.ruleset.is_empty() {
            let mut names: Vec<ConfigName> = base_names
                .into_iter()
                .filter(|name| name.has_prefix(prefix))
                .collect();
            names.sort();
            names.dedup();
            return Ok(names);
        }

        let authority_names: BTreeSet<ConfigName> = self
            .authority
            .list_all_with_prefix(prefix)?
            .into_iter()
            .collect();

        let mut names: BTreeSet<ConfigName> = base_names
            .into_iter()
            .filter(|name| name.has_prefix(prefix))
            .filter(|name| {
                !matches!(self.decision(name), IgnoreDecision::Whole)
                    || authority_names.contains(name)
            })
            .collect();
        names.extend(
            authority_names
                .into_iter()
                .filter(|name| matches!(self.decision(name), IgnoreDecision::Whole)),
        );
        Ok(names.into_iter().collect())
    }
}
