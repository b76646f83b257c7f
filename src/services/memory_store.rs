//! In-memory [`ObjectStore`] used by tests.

use crate::{
    models::object::StoredObject,
    services::object_store::{ObjectStore, StoreError, StoreResult, ensure_key_safe},
};
use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::BTreeMap,
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

type Container = BTreeMap<String, (Vec<u8>, StoredObject)>;

/// Object store keeping every container in a map. Counts calls and can be
/// told to fail writes of one key.
#[derive(Default)]
pub struct MemoryObjectStore {
    containers: Mutex<BTreeMap<String, Container>>,
    calls: AtomicUsize,
    failing_key: Mutex<Option<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trait calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every `put` of `key` fail with an I/O error.
    pub fn fail_puts_of(&self, key: &str) {
        *self.failing_key.lock().unwrap() = Some(key.to_string());
    }

    /// Keys currently stored in `container`, manifest included.
    pub fn keys(&self, container: &str) -> Vec<String> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.containers.lock().unwrap().keys().cloned().collect()
    }

    /// Remove an object behind the manifest's back.
    pub fn remove_silently(&self, container: &str, key: &str) {
        if let Some(objects) = self.containers.lock().unwrap().get_mut(container) {
            objects.remove(key);
        }
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn with_container<T>(
        &self,
        container: &str,
        f: impl FnOnce(&mut Container) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut containers = self.containers.lock().unwrap();
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))?;
        f(objects)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create_container(&self, container: &str) -> StoreResult<()> {
        self.record_call();
        let mut containers = self.containers.lock().unwrap();
        if containers.contains_key(container) {
            return Err(StoreError::ContainerAlreadyExists(container.to_string()));
        }
        containers.insert(container.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        self.record_call();
        self.containers
            .lock()
            .unwrap()
            .remove(container)
            .map(|_| ())
            .ok_or_else(|| StoreError::ContainerNotFound(container.to_string()))
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        overwrite: bool,
    ) -> StoreResult<StoredObject> {
        self.record_call();
        ensure_key_safe(key)?;
        if self.failing_key.lock().unwrap().as_deref() == Some(key) {
            return Err(StoreError::Io(io::Error::other("injected write failure")));
        }
        self.with_container(container, |objects| {
            if !overwrite && objects.contains_key(key) {
                return Err(StoreError::ObjectAlreadyExists {
                    container: container.to_string(),
                    key: key.to_string(),
                });
            }
            let meta = StoredObject {
                container: container.to_string(),
                key: key.to_string(),
                size_bytes: data.len() as i64,
                etag: format!("{:x}", md5::compute(data)),
                last_modified: Utc::now(),
            };
            objects.insert(key.to_string(), (data.to_vec(), meta.clone()));
            Ok(meta)
        })
    }

    async fn get(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        self.record_call();
        self.with_container(container, |objects| {
            objects
                .get(key)
                .map(|(data, _)| data.clone())
                .ok_or_else(|| StoreError::ObjectNotFound {
                    container: container.to_string(),
                    key: key.to_string(),
                })
        })
    }

    async fn exists(&self, container: &str, key: &str) -> StoreResult<bool> {
        self.record_call();
        Ok(self
            .containers
            .lock()
            .unwrap()
            .get(container)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn delete(&self, container: &str, key: &str) -> StoreResult<bool> {
        self.record_call();
        Ok(self
            .containers
            .lock()
            .unwrap()
            .get_mut(container)
            .is_some_and(|objects| objects.remove(key).is_some()))
    }

    async fn list(&self, container: &str) -> StoreResult<Vec<StoredObject>> {
        self.record_call();
        self.with_container(container, |objects| {
            Ok(objects.values().map(|(_, meta)| meta.clone()).collect())
        })
    }
}
