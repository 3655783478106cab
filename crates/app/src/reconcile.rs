//! Two-pass reconciliation of an incoming store against an authority store.
//!
//! Pass A walks the authority's ignored objects and copies their protected
//! values into the incoming store. Pass B walks objects ignored only on the
//! incoming side and removes what the authority would not keep.
//!
//! Keyed decisions are deliberately asymmetric: Pass A skips a keyed object
//! missing from the incoming store, while Pass B strips keys from objects the
//! authority lacks.

use config_ignore_domain::{
    CollectionId, ConfigName, ConfigTree, IgnoreDecision, IgnoreDecisions, KeyPath, Ruleset,
    get_path, remove_path, resolve_names, set_path,
};
use config_ignore_ports::{ConfigStore, LogFields, LoggerPort, collections_union};
use config_ignore_shared::{ErrorCode, ErrorEnvelope, Result, ResultExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Dependencies required by reconcile.
#[derive(Clone, Default)]
pub struct ReconcileDeps {
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// One mutation applied to the incoming store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Whole object replaced by the authority's copy.
    Replaced {
        /// Object name.
        name: ConfigName,
    },
    /// Protected keys copied from (or removed to match) the authority.
    KeysMerged {
        /// Object name.
        name: ConfigName,
        /// Protected key paths.
        keys: Vec<KeyPath>,
    },
    /// Keyed object absent from the incoming store; left absent.
    SkippedMissing {
        /// Object name.
        name: ConfigName,
    },
    /// Whole-ignored object unknown to the authority; deleted.
    Deleted {
        /// Object name.
        name: ConfigName,
    },
    /// Protected keys removed from an object unknown to the authority.
    KeysStripped {
        /// Object name.
        name: ConfigName,
        /// Protected key paths.
        keys: Vec<KeyPath>,
    },
}

impl ReconcileAction {
    /// Object the action applied to.
    #[must_use]
    pub const fn name(&self) -> &ConfigName {
        match self {
            Self::Replaced { name }
            | Self::KeysMerged { name, .. }
            | Self::SkippedMissing { name }
            | Self::Deleted { name }
            | Self::KeysStripped { name, .. } => name,
        }
    }

    /// Stable label for reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Replaced { .. } => "replaced",
            Self::KeysMerged { .. } => "keys_merged",
            Self::SkippedMissing { .. } => "skipped_missing",
            Self::Deleted { .. } => "deleted",
            Self::KeysStripped { .. } => "keys_stripped",
        }
    }
}

/// Actions applied within one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    /// Collection processed.
    pub collection: CollectionId,
    /// Actions in application order (Pass A, then Pass B).
    pub actions: Vec<ReconcileAction>,
}

/// Action totals across a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCounts {
    /// Whole objects replaced.
    pub replaced: usize,
    /// Keyed objects merged.
    pub keys_merged: usize,
    /// Keyed objects skipped because the incoming side lacked them.
    pub skipped_missing: usize,
    /// Objects deleted.
    pub deleted: usize,
    /// Keyed objects stripped.
    pub keys_stripped: usize,
}

impl ActionCounts {
    /// Sum of all counts.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.replaced + self.keys_merged + self.skipped_missing + self.deleted + self.keys_stripped
    }
}

/// Outcome of a reconcile run. Collections without actions are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Per-collection actions, default collection first.
    pub collections: Vec<CollectionReport>,
}

impl ReconcileReport {
    /// True when nothing was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Totals per action kind.
    #[must_use]
    pub fn counts(&self) -> ActionCounts {
        let mut counts = ActionCounts::default();
        for action in self
            .collections
            .iter()
            .flat_map(|collection| &collection.actions)
        {
            match action {
                ReconcileAction::Replaced { .. } => counts.replaced += 1,
                ReconcileAction::KeysMerged { .. } => counts.keys_merged += 1,
                ReconcileAction::SkippedMissing { .. } => counts.skipped_missing += 1,
                ReconcileAction::Deleted { .. } => counts.deleted += 1,
                ReconcileAction::KeysStripped { .. } => counts.keys_stripped += 1,
            }
        }
        counts
    }
}

/// Ignore decisions for every object currently in `store`.
pub fn resolve_store(ruleset: &Ruleset, store: &dyn ConfigStore) -> Result<IgnoreDecisions> {
    let names = store.list_all()?;
    Ok(resolve_names(ruleset, &names))
}

/// Reconcile `incoming` against `authority`, mutating only `incoming`.
///
/// The default collection is processed first, then every named collection
/// either store holds. The first store error aborts the run; writes already
/// committed stay committed.
pub fn reconcile(
    deps: &ReconcileDeps,
    authority: &dyn ConfigStore,
    incoming: &dyn ConfigStore,
    ruleset: &Ruleset,
) -> Result<ReconcileReport> {
    let started_at = Instant::now();
    if let Some(logger) = deps.logger.as_ref() {
        logger.info(
            "configIgnore.reconcile.start",
            "Reconcile started",
            Some(log_fields_start(ruleset)),
        );
    }

    let result = reconcile_collections(authority, incoming, ruleset);

    match result {
        Ok(report) => {
            if let Some(logger) = deps.logger.as_ref() {
                logger.info(
                    "configIgnore.reconcile.completed",
                    "Reconcile completed",
                    Some(log_fields_completed(&report, started_at)),
                );
            }
            Ok(report)
        },
        Err(error) => {
            if let Some(logger) = deps.logger.as_ref() {
                logger.failure(
                    "configIgnore.reconcile.failed",
                    "Reconcile failed",
                    Some(log_fields_duration(started_at)),
                    &error,
                );
            }
            Err(error)
        },
    }
}

fn reconcile_collections(
    authority: &dyn ConfigStore,
    incoming: &dyn ConfigStore,
    ruleset: &Ruleset,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    if ruleset.is_empty() {
        return Ok(report);
    }

    for collection in collections_union(authority, incoming)? {
        let authority_c = authority.scoped(&collection);
        let incoming_c = incoming.scoped(&collection);
        let actions = reconcile_collection(authority_c.as_ref(), incoming_c.as_ref(), ruleset)
            .with_error_metadata("collection", collection.to_string())?;
        if !actions.is_empty() {
            report.collections.push(CollectionReport {
                collection,
                actions,
            });
        }
    }
    Ok(report)
}

#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(collection = %incoming.collection())
)]
fn reconcile_collection(
    authority: &dyn ConfigStore,
    incoming: &dyn ConfigStore,
    ruleset: &Ruleset,
) -> Result<Vec<ReconcileAction>> {
    let mut actions = Vec::new();

    // Pass A
    let authority_decisions = resolve_store(ruleset, authority)?;
    for (name, decision) in &authority_decisions {
        let action = match decision {
            IgnoreDecision::NotIgnored => continue,
            IgnoreDecision::Whole => {
                let data = read_listed(authority, name, "authority")?;
                incoming
                    .write(name, &data)
                    .with_error_metadata("name", name.as_str())?;
                ReconcileAction::Replaced { name: name.clone() }
            },
            IgnoreDecision::Keyed(keys) => {
                let Some(mut data) = incoming
                    .read(name)
                    .with_error_metadata("name", name.as_str())?
                else {
                    tracing::debug!(name = %name, "keyed object missing from incoming store");
                    actions.push(ReconcileAction::SkippedMissing { name: name.clone() });
                    continue;
                };
                let source = read_listed(authority, name, "authority")?;
                merge_keys(&mut data, &source, keys);
                incoming
                    .write(name, &data)
                    .with_error_metadata("name", name.as_str())?;
                ReconcileAction::KeysMerged {
                    name: name.clone(),
                    keys: keys.clone(),
                }
            },
        };
        tracing::debug!(name = %name, action = action.label(), "pass A");
        actions.push(action);
    }

    // Pass B
    let incoming_decisions = resolve_store(ruleset, incoming)?;
    for (name, decision) in incoming_decisions {
        if authority_decisions.contains_key(&name) {
            continue;
        }
        let action = match decision {
            IgnoreDecision::NotIgnored => continue,
            IgnoreDecision::Whole => {
                incoming
                    .delete(&name)
                    .with_error_metadata("name", name.as_str())?;
                ReconcileAction::Deleted { name }
            },
            IgnoreDecision::Keyed(keys) => {
                let mut data = read_listed(incoming, &name, "incoming")?;
                for key in &keys {
                    remove_path(&mut data, key);
                }
                incoming
                    .write(&name, &data)
                    .with_error_metadata("name", name.as_str())?;
                ReconcileAction::KeysStripped { name, keys }
            },
        };
        tracing::debug!(name = %action.name(), action = action.label(), "pass B");
        actions.push(action);
    }

    Ok(actions)
}

/// Copy each protected key from `source` into `target`, removing keys the
/// source lacks.
pub(crate) fn merge_keys(target: &mut ConfigTree, source: &ConfigTree, keys: &[KeyPath]) {
    for key in keys {
        match get_path(source, key) {
            Some(value) => set_path(target, key, value.clone()),
            None => {
                remove_path(target, key);
            },
        }
    }
}

fn read_listed(store: &dyn ConfigStore, name: &ConfigName, side: &str) -> Result<ConfigTree> {
    store
        .read(name)
        .with_error_metadata("name", name.as_str())?
        .ok_or_else(|| listed_object_missing(name, side))
}

fn listed_object_missing(name: &ConfigName, side: &str) -> ErrorEnvelope {
    ErrorEnvelope::invariant(
        ErrorCode::new("reconcile", "listed_object_missing"),
        format!("{side} store listed {name} but could not read it"),
    )
    .with_metadata("name", name.as_str())
    .with_metadata("side", side)
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn log_fields_start(ruleset: &Ruleset) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert(
        "patterns".to_owned().into_boxed_str(),
        Value::from(ruleset.patterns.len()),
    );
    fields.insert(
        "wholePatterns".to_owned().into_boxed_str(),
        Value::from(
            ruleset
                .patterns
                .iter()
                .filter(|pattern| pattern.is_whole())
                .count(),
        ),
    );
    fields.insert(
        "exceptions".to_owned().into_boxed_str(),
        Value::from(ruleset.exceptions.len()),
    );
    fields
}

fn log_fields_duration(started_at: Instant) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert(
        "durationMs".to_owned().into_boxed_str(),
        Value::from(duration_ms(started_at)),
    );
    fields
}

fn log_fields_completed(report: &ReconcileReport, started_at: Instant) -> LogFields {
    let mut fields = log_fields_duration(started_at);
    let counts = report.counts();
    fields.insert(
        "collections".to_owned().into_boxed_str(),
        Value::from(report.collections.len()),
    );
    fields.insert(
        "actions".to_owned().into_boxed_str(),
        serde_json::to_value(counts).unwrap_or(Value::Null),
    );
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_ignore_adapters::MemoryConfigStore;
    use config_ignore_domain::compile_rules;
    use serde_json::json;

    fn key(raw: &str) -> Result<KeyPath> {
        KeyPath::parse(raw).map_err(ErrorEnvelope::from)
    }

    #[test]
    fn merge_keys_copies_and_removes() -> Result<()> {
        let mut target = json!({"name": "Old", "page": {"front": "/old", "403": "/denied"}});
        let source = json!({"name": "New", "page": {}});

        merge_keys(&mut target, &source, &[key("name")?, key("page.front")?]);

        assert_eq!(target, json!({"name": "New", "page": {"403": "/denied"}}));
        Ok(())
    }

    #[test]
    fn start_fields_count_whole_patterns_and_exceptions() -> Result<()> {
        let ruleset = compile_rules(["system.*", "system.site:name", "~system.menu"])
            .map_err(ErrorEnvelope::from)?;

        let fields = log_fields_start(&ruleset);

        assert_eq!(fields.get("patterns"), Some(&Value::from(2)));
        assert_eq!(fields.get("wholePatterns"), Some(&Value::from(1)));
        assert_eq!(fields.get("exceptions"), Some(&Value::from(1)));
        Ok(())
    }

    #[test]
    fn counts_tally_by_kind() -> Result<()> {
        let site = ConfigName::parse("system.site").map_err(ErrorEnvelope::from)?;
        let report = ReconcileReport {
            collections: vec![CollectionReport {
                collection: CollectionId::Default,
                actions: vec![
                    ReconcileAction::Replaced { name: site.clone() },
                    ReconcileAction::Deleted { name: site.clone() },
                    ReconcileAction::SkippedMissing { name: site },
                ],
            }],
        };
        let counts = report.counts();
        assert_eq!(counts.replaced, 1);
        assert_eq!(counts.deleted, 1);
        assert_eq!(counts.skipped_missing, 1);
        assert_eq!(counts.total(), 3);
        Ok(())
    }

    #[test]
    fn action_serializes_with_tag() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let action = ReconcileAction::KeysMerged {
            name: ConfigName::parse("system.site").map_err(ErrorEnvelope::from)?,
            keys: vec![key("page.front")?],
        };
        assert_eq!(
            serde_json::to_value(&action)?,
            json!({"action": "keys_merged", "name": "system.site", "keys": ["page.front"]})
        );
        Ok(())
    }

    #[test]
    fn empty_ruleset_leaves_incoming_untouched() -> Result<()> {
        let site = ConfigName::parse("system.site").map_err(ErrorEnvelope::from)?;
        let authority = MemoryConfigStore::from_objects([(site.clone(), json!({"name": "A"}))])?;
        let incoming = MemoryConfigStore::from_objects([(site.clone(), json!({"name": "B"}))])?;
        let ruleset = compile_rules(Vec::<String>::new())?;

        let report = reconcile(&ReconcileDeps::default(), &authority, &incoming, &ruleset)?;

        assert!(report.is_empty());
        assert_eq!(incoming.read(&site)?, Some(json!({"name": "B"})));
        Ok(())
    }

    #[test]
    fn authority_read_race_is_an_invariant_error() -> Result<()> {
        struct ListsButCannotRead(MemoryConfigStore);

        impl ConfigStore for ListsButCannotRead {
            fn collection(&self) -> &CollectionId {
                self.0.collection()
            }
            fn list_all(&self) -> Result<Vec<ConfigName>> {
                self.0.list_all()
            }
            fn read(&self, _name: &ConfigName) -> Result<Option<ConfigTree>> {
                Ok(None)
            }
            fn write(&self, name: &ConfigName, data: &ConfigTree) -> Result<()> {
                self.0.write(name, data)
            }
            fn delete(&self, name: &ConfigName) -> Result<bool> {
                self.0.delete(name)
            }
            fn collections(&self) -> Result<Vec<CollectionId>> {
                self.0.collections()
            }
            fn scoped(&self, collection: &CollectionId) -> Box<dyn ConfigStore> {
                Box::new(Self(self.0.in_collection(collection.clone())))
            }
        }

        let site = ConfigName::parse("system.site").map_err(ErrorEnvelope::from)?;
        let authority = ListsButCannotRead(MemoryConfigStore::from_objects([(
            site,
            json!({"name": "A"}),
        )])?);
        let incoming = MemoryConfigStore::new();
        let ruleset = compile_rules(["system.site"])?;

        let error = reconcile(&ReconcileDeps::default(), &authority, &incoming, &ruleset).err();
        assert!(error.is_some_and(|error| {
            error.has_code("reconcile", "listed_object_missing")
                && error.kind == config_ignore_shared::ErrorKind::Invariant
                && error.metadata.get("collection").map(String::as_str) == Some("(default)")
        }));
        Ok(())
    }
}
