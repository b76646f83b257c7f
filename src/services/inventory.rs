//! Per-container manifest (`.blobinventory`) persisted in the object store.

use crate::{
    models::file_record::FileRecord,
    services::object_store::{ObjectStore, StoreError, StoreResult},
};
use tracing::{debug, warn};

/// Reserved key of the manifest object inside every container.
pub const MANIFEST_KEY: &str = ".blobinventory";

/// Manifest access scoped to one container.
///
/// Saves overwrite unconditionally; callers that need load→save atomicity
/// hold the container lock from [`crate::services::locks::ContainerLocks`].
pub struct InventoryStore<'a> {
    store: &'a dyn ObjectStore,
    container: &'a str,
}

impl<'a> InventoryStore<'a> {
    pub fn new(store: &'a dyn ObjectStore, container: &'a str) -> Self {
        Self { store, container }
    }

    /// Fetch and parse the manifest.
    ///
    /// A missing or unparsable manifest loads as empty; other store errors
    /// propagate.
    pub async fn load(&self) -> StoreResult<Vec<FileRecord>> {
        let raw = match self.store.get(self.container, MANIFEST_KEY).await {
            Ok(raw) => raw,
            Err(StoreError::ObjectNotFound { .. }) => {
                debug!("container {} has no manifest yet", self.container);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        match serde_json::from_slice::<Vec<FileRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(
                    "manifest of container {} is unreadable, treating as empty: {}",
                    self.container, err
                );
                Ok(Vec::new())
            }
        }
    }

    /// Overwrite the manifest with `records` as pretty-printed JSON.
    pub async fn save(&self, records: &[FileRecord]) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(records)?;
        self.store
            .put(self.container, MANIFEST_KEY, &body, true)
            .await?;
        debug!(
            "saved manifest of container {} ({} records)",
            self.container,
            records.len()
        );
        Ok(())
    }

    /// Replace any record named like `record.name` with `record`.
    pub async fn upsert_by_name(&self, record: FileRecord) -> StoreResult<()> {
        let mut records = self.load().await?;
        records.retain(|r| r.name != record.name);
        records.push(record);
        self.save(&records).await
    }

    /// Drop every record named `name`. Returns whether any record matched.
    pub async fn remove_by_name(&self, name: &str) -> StoreResult<bool> {
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.name != name);
        self.save(&records).await?;
        Ok(records.len() != before)
    }
}
