//! Administrator file operations on a case container: listing, download and
//! delete with manifest reconciliation.

use crate::{
    models::{file_record::FileRecord, object::StoredObject},
    services::{
        cases::{CaseError, CaseResult},
        hasher::ContentHash,
        inventory::{InventoryStore, MANIFEST_KEY},
        locks::ContainerLocks,
        object_store::{ObjectStore, StoreError},
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tracing::info;

/// A stored object joined with its manifest record, if any.
#[derive(Serialize, Clone, Debug)]
pub struct FileEntry {
    pub name: String,
    /// Size of the stored payload.
    pub stored_size: i64,
    pub last_modified: DateTime<Utc>,
    /// Size of the payload as uploaded, from the manifest.
    pub size: Option<u64>,
    pub unzipped_hash: Option<ContentHash>,
    pub zipped_hash: Option<ContentHash>,
    pub upload_date: Option<DateTime<Utc>>,
}

impl FileEntry {
    fn new(object: StoredObject, record: Option<&FileRecord>) -> Self {
        Self {
            name: object.key,
            stored_size: object.size_bytes,
            last_modified: object.last_modified,
            size: record.map(|r| r.size),
            unzipped_hash: record.map(|r| r.unzipped_hash),
            zipped_hash: record.map(|r| r.zipped_hash),
            upload_date: record.map(|r| r.upload_date),
        }
    }
}

#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn ObjectStore>,
    locks: ContainerLocks,
}

impl FileService {
    pub fn new(store: Arc<dyn ObjectStore>, locks: ContainerLocks) -> Self {
        Self { store, locks }
    }

    /// Every object in `container` except the manifest, ordered by key.
    pub async fn list_files(&self, container: &str) -> CaseResult<Vec<FileEntry>> {
        let objects = self.store.list(container).await?;
        let records = InventoryStore::new(self.store.as_ref(), container)
            .load()
            .await?;
        let by_name: HashMap<&str, &FileRecord> =
            records.iter().map(|r| (r.name.as_str(), r)).collect();

        Ok(objects
            .into_iter()
            .filter(|o| o.key != MANIFEST_KEY)
            .map(|o| {
                let record = by_name.get(o.key.as_str()).copied();
                FileEntry::new(o, record)
            })
            .collect())
    }

    /// Read a stored file. The manifest is not addressable.
    pub async fn download_file(&self, container: &str, key: &str) -> CaseResult<Vec<u8>> {
        if key == MANIFEST_KEY {
            return Err(not_found(key));
        }
        match self.store.get(container, key).await {
            Ok(data) => Ok(data),
            Err(StoreError::ObjectNotFound { .. }) | Err(StoreError::InvalidObjectKey) => {
                Err(not_found(key))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a stored file and drop its manifest record.
    pub async fn delete_file(&self, container: &str, key: &str) -> CaseResult<()> {
        if key == MANIFEST_KEY {
            return Err(not_found(key));
        }

        let _guard = self.locks.lock(container).await;
        let deleted = match self.store.delete(container, key).await {
            Ok(deleted) => deleted,
            Err(StoreError::InvalidObjectKey) => false,
            Err(err) => return Err(err.into()),
        };
        if !deleted {
            return Err(not_found(key));
        }
        InventoryStore::new(self.store.as_ref(), container)
            .remove_by_name(key)
            .await?;

        info!("deleted {}/{}", container, key);
        Ok(())
    }
}

fn not_found(key: &str) -> CaseError {
    CaseError::NotFound(format!("File `{key}` not found."))
}
