//! Per-container mutual exclusion for manifest read-modify-write cycles.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Named async locks, one per container, shared by every request handler in
/// the process.
#[derive(Clone, Default)]
pub struct ContainerLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ContainerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `container`.
    pub async fn lock(&self, container: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .inner
            .entry(container.to_string())
            .or_default()
            .clone();
        mutex.lock_owned().await
    }

    /// Drop the lock entry of a deleted container.
    pub fn forget(&self, container: &str) {
        self.inner.remove(container);
    }
}
