//! Configuration store boundary contract.

use config_ignore_domain::{CollectionId, ConfigName, ConfigTree};
use config_ignore_shared::Result;

/// Key-addressable set of named configuration objects within one collection.
///
/// Calls are synchronous and commit independently; implementations must be
/// safe to share across threads but callers serialize concurrent mutation of
/// the same store.
pub trait ConfigStore: Send + Sync {
    /// Collection this handle is scoped to.
    fn collection(&self) -> &CollectionId;

    /// All object names in this collection, sorted.
    fn list_all(&self) -> Result<Vec<ConfigName>>;

    /// Object names starting with `prefix`, sorted.
    fn list_all_with_prefix(&self, prefix: &str) -> Result<Vec<ConfigName>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|name| name.has_prefix(prefix))
            .collect())
    }

    /// Read one object; `Ok(None)` when it does not exist.
    fn read(&self, name: &ConfigName) -> Result<Option<ConfigTree>>;

    /// Create or replace one object.
    fn write(&self, name: &ConfigName, data: &ConfigTree) -> Result<()>;

    /// Delete one object; returns true when something was removed.
    fn delete(&self, name: &ConfigName) -> Result<bool>;

    /// Returns true when the object exists.
    fn exists(&self, name: &ConfigName) -> Result<bool> {
        Ok(self.read(name)?.is_some())
    }

    /// Named collections holding at least one object, sorted.
    ///
    /// Never includes [`CollectionId::Default`].
    fn collections(&self) -> Result<Vec<CollectionId>>;

    /// Handle onto another collection of the same underlying store.
    fn scoped(&self, collection: &CollectionId) -> Box<dyn ConfigStore>;
}

/// Collections to visit when processing a pair of stores: the default
/// collection first, then the sorted union of both stores' named collections.
pub fn collections_union(
    first: &dyn ConfigStore,
    second: &dyn ConfigStore,
) -> Result<Vec<CollectionId>> {
    let mut named = first.collections()?;
    named.extend(second.collections()?);
    named.retain(|collection| !collection.is_default());
    named.sort();
    named.dedup();

    let mut collections = Vec::with_capacity(named.len() + 1);
    collections.push(CollectionId::Default);
    collections.extend(named);
    Ok(collections)
}
