//! In-memory config store.

use config_ignore_domain::{CollectionId, ConfigName, ConfigTree};
use config_ignore_ports::ConfigStore;
use config_ignore_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type CollectionData = BTreeMap<ConfigName, ConfigTree>;
type StoreData = BTreeMap<CollectionId, CollectionData>;

/// In-memory store; scoped handles share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    data: Arc<RwLock<StoreData>>,
    collection: CollectionId,
}

impl MemoryConfigStore {
    /// Create an empty store scoped to the default collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `objects` in the default collection.
    pub fn from_objects<I>(objects: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ConfigName, ConfigTree)>,
    {
        let store = Self::new();
        for (name, data) in objects {
            store.write(&name, &data)?;
        }
        Ok(store)
    }

    /// Handle onto `collection` sharing this store's data.
    #[must_use]
    pub fn in_collection(&self, collection: CollectionId) -> Self {
        Self {
            data: Arc::clone(&self.data),
            collection,
        }
    }

    /// Copy of every object in every collection.
    pub fn dump(&self) -> Result<BTreeMap<CollectionId, BTreeMap<ConfigName, ConfigTree>>> {
        let guard = self.read_guard()?;
        Ok(guard
            .iter()
            .filter(|(_, objects)| !objects.is_empty())
            .map(|(collection, objects)| (collection.clone(), objects.clone()))
            .collect())
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, StoreData>> {
        self.data.read().map_err(|_| lock_poisoned())
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, StoreData>> {
        self.data.write().map_err(|_| lock_poisoned())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn collection(&self) -> &CollectionId {
        &self.collection
    }

    fn list_all(&self) -> Result<Vec<ConfigName>> {
        let guard = self.read_guard()?;
        Ok(guard
            .get(&self.collection)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn list_all_with_prefix(&self, prefix: &str) -> Result<Vec<ConfigName>> {
        let guard = self.read_guard()?;
        Ok(guard
            .get(&self.collection)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|name| name.has_prefix(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read(&self, name: &ConfigName) -> Result<Option<ConfigTree>> {
        let guard = self.read_guard()?;
        Ok(guard
            .get(&self.collection)
            .and_then(|objects| objects.get(name))
            .cloned())
    }

    fn write(&self, name: &ConfigName, data: &ConfigTree) -> Result<()> {
        let mut guard = self.write_guard()?;
        guard
            .entry(self.collection.clone())
            .or_default()
            .insert(name.clone(), data.clone());
        Ok(())
    }

    fn delete(&self, name: &ConfigName) -> Result<bool> {
        let mut guard = self.write_guard()?;
        Ok(guard
            .get_mut(&self.collection)
            .and_then(|objects| objects.remove(name))
            .is_some())
    }

    fn exists(&self, name: &ConfigName) -> Result<bool> {
        let guard = self.read_guard()?;
        Ok(guard
            .get(&self.collection)
            .is_some_and(|objects| objects.contains_key(name)))
    }

    fn collections(&self) -> Result<Vec<CollectionId>> {
        let guard = self.read_guard()?;
        Ok(guard
            .iter()
            .filter(|(collection, objects)| !collection.is_default() && !objects.is_empty())
            .map(|(collection, _)| collection.clone())
            .collect())
    }

    fn scoped(&self, collection: &CollectionId) -> Box<dyn ConfigStore> {
        Box::new(self.in_collection(collection.clone()))
    }
}

/// Copy every collection of `source` into a fresh in-memory store.
///
/// Transforms run against the copy so the source is never touched until the
/// result is mirrored back.
pub fn snapshot_store(source: &dyn ConfigStore) -> Result<MemoryConfigStore> {
    let snapshot = MemoryConfigStore::new();
    let mut collections = vec![CollectionId::Default];
    collections.extend(source.collections()?);

    for collection in collections {
        let from = source.scoped(&collection);
        let to = snapshot.in_collection(collection);
        for name in from.list_all()? {
            if let Some(data) = from.read(&name)? {
                to.write(&name, &data)?;
            }
        }
    }
    Ok(snapshot)
}

fn lock_poisoned() -> ErrorEnvelope {
    ErrorEnvelope::invariant(
        ErrorCode::new("store", "lock_poisoned"),
        "memory store lock poisoned",
    )
}
