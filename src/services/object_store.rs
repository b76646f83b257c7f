//! Object storage abstraction: one flat key space per container.

use crate::models::object::StoredObject;
use async_trait::async_trait;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("container `{0}` not found")]
    ContainerNotFound(String),
    #[error("container `{0}` already exists")]
    ContainerAlreadyExists(String),
    #[error("container name `{name}` invalid: {reason}")]
    InvalidContainerName { name: String, reason: String },
    #[error("object `{key}` not found in container `{container}`")]
    ObjectNotFound { container: String, key: String },
    #[error("object `{key}` already exists in container `{container}`")]
    ObjectAlreadyExists { container: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("manifest serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Container-scoped blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create an empty container.
    async fn create_container(&self, container: &str) -> StoreResult<()>;

    /// Remove a container together with every object in it.
    async fn delete_container(&self, container: &str) -> StoreResult<()>;

    /// Store `data` under `key`.
    ///
    /// With `overwrite == false` an existing key yields
    /// [`StoreError::ObjectAlreadyExists`].
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        overwrite: bool,
    ) -> StoreResult<StoredObject>;

    /// Read all bytes of an object.
    async fn get(&self, container: &str, key: &str) -> StoreResult<Vec<u8>>;

    /// Check whether an object exists.
    async fn exists(&self, container: &str, key: &str) -> StoreResult<bool>;

    /// Delete an object. Returns `false` if it did not exist.
    async fn delete(&self, container: &str, key: &str) -> StoreResult<bool>;

    /// List all objects in a container ordered by key.
    async fn list(&self, container: &str) -> StoreResult<Vec<StoredObject>>;
}

/// Basic key validation for the flat key space.
///
/// Rejects empty or oversized keys, path separators, `..` and control
/// characters.
pub fn ensure_key_safe(key: &str) -> StoreResult<()> {
    const MAX_OBJECT_KEY_LEN: usize = 1024;

    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StoreError::InvalidObjectKey);
    }
    if key == "." || key == ".." || key.contains('/') || key.contains('\\') {
        return Err(StoreError::InvalidObjectKey);
    }
    if key.bytes().any(|b| b.is_ascii_control()) {
        return Err(StoreError::InvalidObjectKey);
    }
    Ok(())
}

/// Validate container name format.
///
/// 3–63 characters of lowercase letters, digits and hyphens, starting and
/// ending with a letter or digit.
pub fn ensure_container_name_safe(name: &str) -> StoreResult<()> {
    const MIN_LEN: usize = 3;
    const MAX_LEN: usize = 63;

    let invalid = |reason: &str| StoreError::InvalidContainerName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.len() < MIN_LEN || name.len() > MAX_LEN {
        return Err(invalid("must be between 3 and 63 characters"));
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'))
    {
        return Err(invalid(
            "allowed characters are lowercase letters, digits, and hyphens",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a lowercase letter or digit"));
    }
    Ok(())
}
