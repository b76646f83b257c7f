//! src/services/storage_service.rs
//!
//! FsObjectStore: container/object storage backed by SQLite for the object
//! index and local disk for payloads. Payloads are sharded beneath
//! `base_path/{container}/{shard}/{shard}/{key}`.

use crate::{
    models::object::StoredObject,
    services::object_store::{
        ObjectStore, StoreError, StoreResult, ensure_container_name_safe, ensure_key_safe,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Disk-backed [`ObjectStore`].
///
/// SQLite is the source of truth for which keys exist; the disk holds the
/// bytes. A payload is fsynced to a temp file, indexed, then renamed into
/// place.
#[derive(Clone)]
pub struct FsObjectStore {
    /// Shared SQLite connection pool used for the object index.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where payloads are stored.
    pub base_path: PathBuf,
}

impl FsObjectStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Physical root folder of a container. Does not check existence.
    fn container_root(&self, container: &str) -> PathBuf {
        self.base_path.join(container)
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(container/key) and returns the first two bytes as lowercase
    /// hex (00–ff).
    fn object_shards(container: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", container, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, container: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(container, key);
        let mut path = self.container_root(container);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Returns ContainerNotFound if no index row exists for `container`.
    async fn fetch_container(&self, container: &str) -> StoreResult<()> {
        ensure_container_name_safe(container)?;
        sqlx::query_scalar::<_, String>("SELECT name FROM containers WHERE name = ?")
            .bind(container)
            .fetch_one(&*self.db)
            .await
            .map(|_| ())
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StoreError::ContainerNotFound(container.to_string()),
                other => StoreError::Sqlx(other),
            })
    }

    async fn fetch_object(&self, container: &str, key: &str) -> StoreResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(
            "SELECT container, key, size_bytes, etag, last_modified
             FROM objects WHERE container = ? AND key = ?",
        )
        .bind(container)
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::ObjectNotFound {
                container: container.to_string(),
                key: key.to_string(),
            },
            other => StoreError::Sqlx(other),
        })
    }

    /// Write `data` to a fsynced temp file next to `file_path` and return
    /// its path. The temp file is removed on any failure.
    async fn stage_payload(&self, file_path: &Path, data: &[u8]) -> StoreResult<PathBuf> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        Ok(tmp_path)
    }

    /// Stage the payload, write its index row, then rename it into place.
    ///
    /// The object path is only replaced once the row is written, so a lost
    /// create-only race leaves the existing payload untouched.
    async fn write_indexed(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        overwrite: bool,
    ) -> StoreResult<StoredObject> {
        let file_path = self.object_path(container, key);
        let tmp_path = self.stage_payload(&file_path, data).await?;

        let sql = if overwrite {
            r#"
            INSERT INTO objects (container, key, size_bytes, etag, last_modified)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(container, key) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            RETURNING container, key, size_bytes, etag, last_modified
            "#
        } else {
            r#"
            INSERT INTO objects (container, key, size_bytes, etag, last_modified)
            VALUES (?, ?, ?, ?, ?)
            RETURNING container, key, size_bytes, etag, last_modified
            "#
        };

        let insert_result = sqlx::query_as::<_, StoredObject>(sql)
            .bind(container)
            .bind(key)
            .bind(data.len() as i64)
            .bind(format!("{:x}", md5::compute(data)))
            .bind(Utc::now())
            .fetch_one(&*self.db)
            .await;

        let object = match insert_result {
            Ok(obj) => obj,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(if is_unique_violation(&err) {
                    StoreError::ObjectAlreadyExists {
                        container: container.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StoreError::Sqlx(err)
                });
            }
        };

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            if !overwrite {
                let _ = sqlx::query("DELETE FROM objects WHERE container = ? AND key = ?")
                    .bind(container)
                    .bind(key)
                    .execute(&*self.db)
                    .await;
            }
            return Err(StoreError::Io(err));
        }
        Ok(object)
    }

    /// Recursively remove empty directories up to `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn create_container(&self, container: &str) -> StoreResult<()> {
        ensure_container_name_safe(container)?;
        fs::create_dir_all(self.container_root(container)).await?;

        match sqlx::query("INSERT INTO containers (name, created_at) VALUES (?, ?)")
            .bind(container)
            .bind(Utc::now())
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::ContainerAlreadyExists(container.to_string()))
            }
            Err(err) => Err(StoreError::Sqlx(err)),
        }
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        ensure_container_name_safe(container)?;

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM objects WHERE container = ?")
            .bind(container)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM containers WHERE name = ?")
            .bind(container)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ContainerNotFound(container.to_string()));
        }
        tx.commit().await?;

        let root = self.container_root(container);
        if let Err(err) = fs::remove_dir_all(&root).await {
            if err.kind() != ErrorKind::NotFound {
                debug!(
                    "failed to remove container directory {} after delete: {}",
                    root.display(),
                    err
                );
            }
        }
        Ok(())
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        overwrite: bool,
    ) -> StoreResult<StoredObject> {
        ensure_key_safe(key)?;
        self.fetch_container(container).await?;

        if !overwrite && self.exists(container, key).await? {
            return Err(StoreError::ObjectAlreadyExists {
                container: container.to_string(),
                key: key.to_string(),
            });
        }
        self.write_indexed(container, key, data, overwrite).await
    }

    async fn get(&self, container: &str, key: &str) -> StoreResult<Vec<u8>> {
        ensure_key_safe(key)?;
        self.fetch_object(container, key).await?;

        fs::read(self.object_path(container, key))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    StoreError::ObjectNotFound {
                        container: container.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StoreError::Io(err)
                }
            })
    }

    async fn exists(&self, container: &str, key: &str) -> StoreResult<bool> {
        ensure_key_safe(key)?;
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM objects WHERE container = ? AND key = ?",
        )
        .bind(container)
        .bind(key)
        .fetch_one(&*self.db)
        .await?;
        Ok(found > 0)
    }

    async fn delete(&self, container: &str, key: &str) -> StoreResult<bool> {
        ensure_key_safe(key)?;
        let result = sqlx::query("DELETE FROM objects WHERE container = ? AND key = ?")
            .bind(container)
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let file_path = self.object_path(container, key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.container_root(container))
                .await;
        }
        Ok(true)
    }

    async fn list(&self, container: &str) -> StoreResult<Vec<StoredObject>> {
        self.fetch_container(container).await?;
        let rows = sqlx::query_as::<_, StoredObject>(
            "SELECT container, key, size_bytes, etag, last_modified
             FROM objects WHERE container = ? ORDER BY key ASC",
        )
        .bind(container)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
