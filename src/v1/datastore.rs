use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use super::resource::StoredResource;
use super::storage::file::FileStorage;

/// Applied-state of one deployment, keyed by resource id.
#[derive(Clone)]
pub struct Datastore {
    inner: HashMap<String, Vec<u8>>,
    storage: Arc<dyn Storage + Send + Sync>,
}

impl Default for Datastore {
    fn default() -> Self {
        Datastore::new(FileStorage::default())
    }
}

pub trait Storage {
    fn load(&self) -> Result<HashMap<String, Vec<u8>>, DatastoreError>;
    fn save(&self, data: &HashMap<String, Vec<u8>>) -> Result<(), DatastoreError>;
}

impl Datastore {
    pub fn new(storage: impl Storage + 'static + Send + Sync) -> Self {
        Self {
            inner: Default::default(),
            storage: Arc::new(storage),
        }
    }
    pub fn reload(&mut self) -> Result<HashMap<String, Vec<u8>>, DatastoreError> {
        tracing::debug!("Load datastore resources from storage");
        self.storage
            .load()
            .map_err(|e| DatastoreError::LoadError(e.to_string()))
            .inspect(|h| {
                for k in h.keys() {
                    tracing::debug!("Resource[{}] loaded from datastore", k);
                }
            })
            .map(|data| std::mem::replace(&mut self.inner, data))
    }
    pub fn save(&self) -> Result<(), DatastoreError> {
        tracing::debug!("Save datastore resources to storage");
        self.storage.save(&self.inner)
    }
    pub fn insert_resource(
        &mut self,
        resource: &StoredResource,
    ) -> Result<Option<StoredResource>, DatastoreError> {
        let id = resource.id().to_string();
        let bytes = serde_json::to_vec(resource)?;
        tracing::debug!("Insert Resource[{}] to datastore", id);
        self.inner
            .insert(id, bytes)
            .map(|previous| serde_json::from_slice(&previous).map_err(DatastoreError::JsonError))
            .transpose()
    }
    pub fn get(&self, id: &str) -> Result<Option<StoredResource>, DatastoreError> {
        self.inner
            .get(id)
            .map(|data| serde_json::from_slice(data).map_err(DatastoreError::JsonError))
            .transpose()
    }
    pub fn all(&self) -> Result<Vec<StoredResource>, DatastoreError> {
        let mut keys = self.keys();
        keys.sort();
        keys.iter()
            .filter_map(|key| self.get(key).transpose())
            .collect()
    }
    pub fn remove(&mut self, id: &str) -> Option<Vec<u8>> {
        tracing::debug!("Remove Resource[{}] from datastore", id);
        self.inner.remove(id)
    }
    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("Load Error error: {0}")]
    LoadError(String),
    #[error("IO Error error: {0}")]
    IOError(#[from] io::Error),
    #[error("Serialization or deserialization error: {0}")]
    BincodeError(#[from] bincode::Error),
    #[error("Serialization or deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::v1::descriptor::{
        function::{EntryPoint, FunctionResource},
        ResourceKind,
    };
    use crate::v1::resource::Resource;
    use crate::v1::storage::memory::MemoryStorage;

    fn record(id: &str) -> StoredResource {
        StoredResource::Function(Resource::new(
            ResourceKind::Function,
            id,
            FunctionResource::new(id, EntryPoint::new("hello", "handler")),
            BTreeSet::new(),
        ))
    }

    #[test]
    fn stored_resources_come_back_unchanged() {
        let mut datastore = Datastore::new(MemoryStorage::default());
        assert!(datastore.insert_resource(&record("Fn")).unwrap().is_none());
        assert_eq!(datastore.get("Fn").unwrap(), Some(record("Fn")));
        assert_eq!(datastore.get("Other").unwrap(), None);
    }

    #[test]
    fn reinserting_returns_the_previous_record() {
        let mut datastore = Datastore::new(MemoryStorage::default());
        datastore.insert_resource(&record("Fn")).unwrap();
        let previous = datastore.insert_resource(&record("Fn")).unwrap();
        assert_eq!(previous, Some(record("Fn")));
    }

    #[test]
    fn save_and_reload_go_through_storage() {
        let storage = MemoryStorage::default();
        let mut datastore = Datastore::new(storage.clone());
        datastore.insert_resource(&record("A")).unwrap();
        datastore.insert_resource(&record("B")).unwrap();
        datastore.save().unwrap();

        let mut reloaded = Datastore::new(storage);
        assert!(reloaded.is_empty());
        reloaded.reload().unwrap();
        let ids: Vec<String> = reloaded
            .all()
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn remove_forgets_the_resource() {
        let mut datastore = Datastore::new(MemoryStorage::default());
        datastore.insert_resource(&record("Fn")).unwrap();
        assert!(datastore.remove("Fn").is_some());
        assert!(!datastore.contains("Fn"));
    }
}
