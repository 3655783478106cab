//! Ignore-aware store comparison and decision preview.

use crate::read_filter::ReadFilter;
use crate::settings::IgnoreSettings;
use config_ignore_domain::{CollectionId, ConfigName, IgnoreDecision, Ruleset};
use config_ignore_ports::{ConfigStore, collections_union};
use config_ignore_shared::{Result, ResultExt};
use serde::Serialize;
use std::collections::BTreeSet;

/// What applying the incoming side would do to one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// Object would be created.
    Create,
    /// Object would change.
    Update,
    /// Object would be removed.
    Delete,
    /// Object stays as it is.
    Unchanged,
}

impl ChangeOp {
    /// Stable label for reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unchanged => "unchanged",
        }
    }
}

/// One compared object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    /// Collection holding the object.
    pub collection: CollectionId,
    /// Object name.
    pub name: ConfigName,
    /// Resulting change.
    pub op: ChangeOp,
    /// Ignore decision applied while comparing.
    pub decision: IgnoreDecision,
}

/// Comparison across every collection, default collection first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreComparison {
    /// Entries sorted by collection then name.
    pub entries: Vec<ComparisonEntry>,
}

impl StoreComparison {
    /// Entries that would change something.
    pub fn changes(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.op != ChangeOp::Unchanged)
    }

    /// Returns true when applying the incoming side changes nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.changes().next().is_none()
    }

    /// Number of entries with `op`.
    #[must_use]
    pub fn count(&self, op: ChangeOp) -> usize {
        self.entries.iter().filter(|entry| entry.op == op).count()
    }
}

/// Compare `incoming` against `authority` as seen through the read-time
/// filter, so ignored objects report what an import would actually leave.
pub fn compare_stores(
    authority: &dyn ConfigStore,
    incoming: &dyn ConfigStore,
    settings: &IgnoreSettings,
) -> Result<StoreComparison> {
    let filter = ReadFilter::new(authority, settings)?;
    let mut comparison = StoreComparison::default();

    for collection in collections_union(authority, incoming)? {
        let filter_c = filter.scoped(&collection);
        let authority_c = authority.scoped(&collection);
        let incoming_c = incoming.scoped(&collection);
        compare_collection(
            &filter_c,
            authority_c.as_ref(),
            incoming_c.as_ref(),
            &mut comparison,
        )
        .with_error_metadata("collection", collection.to_string())?;
    }
    Ok(comparison)
}

fn compare_collection(
    filter: &ReadFilter,
    authority: &dyn ConfigStore,
    incoming: &dyn ConfigStore,
    comparison: &mut StoreComparison,
) -> Result<()> {
    let incoming_names = filter.list_names_including_ignored("", incoming.list_all()?)?;
    let names: BTreeSet<ConfigName> = incoming_names
        .into_iter()
        .chain(authority.list_all()?)
        .collect();

    for name in names {
        let current = authority.read(&name)?;
        let target = filter.resolve_for_read(&name, incoming.read(&name)?)?;
        let op = match (&current, &target) {
            (None, None) => continue,
            (None, Some(_)) => ChangeOp::Create,
            (Some(_), None) => ChangeOp::Delete,
            (Some(current), Some(target)) if current == target => ChangeOp::Unchanged,
            (Some(_), Some(_)) => ChangeOp::Update,
        };
        comparison.entries.push(ComparisonEntry {
            collection: filter.collection().clone(),
            decision: filter.decision(&name),
            name,
            op,
        });
    }
    Ok(())
}

/// Decisions for one collection, one entry per object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDecisions {
    /// Collection inspected.
    pub collection: CollectionId,
    /// Every object with its decision, sorted by name.
    pub decisions: Vec<(ConfigName, IgnoreDecision)>,
}

/// Decision for every object of every collection of `store`.
pub fn preview_decisions(
    ruleset: &Ruleset,
    store: &dyn ConfigStore,
) -> Result<Vec<CollectionDecisions>> {
    let mut collections = vec![CollectionId::Default];
    collections.extend(store.collections()?);

    collections
        .into_iter()
        .map(|collection| {
            let scoped = store.scoped(&collection);
            let decisions = scoped
                .list_all()?
                .into_iter()
                .map(|name| {
                    let decision = ruleset.decide(name.as_str());
                    (name, decision)
                })
                .collect();
            Ok(CollectionDecisions {
                collection,
                decisions,
            })
        })
        .collect()
}
