//! Case lifecycle: creation, lookup by secret, deletion and the default case.

use crate::{
    models::case::{Case, generate_secret, new_container_name},
    services::{
        inventory::InventoryStore,
        locks::ContainerLocks,
        object_store::{ObjectStore, StoreError},
        storage_service::is_unique_violation,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const MAX_CASE_NAME_LEN: usize = 255;
const SECRET_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CaseResult<T> = Result<T, CaseError>;

/// Resolves upload secrets to the container of the matching case.
#[async_trait]
pub trait CaseDirectory: Send + Sync {
    async fn container_for_secret(&self, secret: &str) -> Result<Option<String>, sqlx::Error>;
}

/// Case persistence in SQLite plus the container bookkeeping that goes with
/// creating and deleting a case.
#[derive(Clone)]
pub struct CaseService {
    db: Arc<SqlitePool>,
    store: Arc<dyn ObjectStore>,
    locks: ContainerLocks,
}

impl CaseService {
    pub fn new(db: Arc<SqlitePool>, store: Arc<dyn ObjectStore>, locks: ContainerLocks) -> Self {
        Self { db, store, locks }
    }

    /// All cases ordered by name.
    pub async fn list_cases(&self) -> CaseResult<Vec<Case>> {
        let cases = sqlx::query_as::<_, Case>(
            "SELECT id, name, container_name, secret, is_default, created_at
             FROM cases ORDER BY name ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(cases)
    }

    pub async fn get_case(&self, container_name: &str) -> CaseResult<Case> {
        sqlx::query_as::<_, Case>(
            "SELECT id, name, container_name, secret, is_default, created_at
             FROM cases WHERE container_name = ?",
        )
        .bind(container_name)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| CaseError::NotFound(format!("Case `{container_name}` not found.")))
    }

    /// Create a case with a fresh container, an empty manifest and a new
    /// secret.
    pub async fn create_case(&self, name: &str) -> CaseResult<Case> {
        self.insert_case(name, false).await
    }

    /// Delete a case, its container and every object in it.
    ///
    /// The default case cannot be deleted.
    pub async fn delete_case(&self, container_name: &str) -> CaseResult<Case> {
        let case = self.get_case(container_name).await?;
        if case.is_default {
            return Err(CaseError::Forbidden(
                "The default case cannot be deleted.".into(),
            ));
        }

        let guard = self.locks.lock(container_name).await;
        match self.store.delete_container(container_name).await {
            Ok(()) => {}
            Err(StoreError::ContainerNotFound(_)) => {
                warn!("container {} was already gone", container_name);
            }
            Err(err) => return Err(err.into()),
        }
        sqlx::query("DELETE FROM cases WHERE id = ?")
            .bind(case.id)
            .execute(&*self.db)
            .await?;
        drop(guard);
        self.locks.forget(container_name);

        info!("deleted case {} ({})", case.name, case.container_name);
        Ok(case)
    }

    /// Create the default case named `name` unless one already exists.
    pub async fn ensure_default_case(&self, name: &str) -> CaseResult<Case> {
        let existing = sqlx::query_as::<_, Case>(
            "SELECT id, name, container_name, secret, is_default, created_at
             FROM cases WHERE is_default = 1 LIMIT 1",
        )
        .fetch_optional(&*self.db)
        .await?;

        match existing {
            Some(case) => Ok(case),
            None => {
                let case = self.insert_case(name, true).await?;
                info!("provisioned default case {}", case.container_name);
                Ok(case)
            }
        }
    }

    async fn insert_case(&self, name: &str, is_default: bool) -> CaseResult<Case> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CaseError::Validation("Case name is required.".into()));
        }
        if name.len() > MAX_CASE_NAME_LEN {
            return Err(CaseError::Validation(format!(
                "Case name must be at most {MAX_CASE_NAME_LEN} bytes."
            )));
        }

        let container_name = new_container_name();
        self.store.create_container(&container_name).await?;
        InventoryStore::new(self.store.as_ref(), &container_name)
            .save(&[])
            .await?;

        let mut last_err = None;
        for _ in 0..SECRET_ATTEMPTS {
            let case = Case {
                id: Uuid::new_v4(),
                name: name.to_string(),
                container_name: container_name.clone(),
                secret: generate_secret(),
                is_default,
                created_at: Utc::now(),
            };
            let inserted = sqlx::query(
                "INSERT INTO cases (id, name, container_name, secret, is_default, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(case.id)
            .bind(&case.name)
            .bind(&case.container_name)
            .bind(&case.secret)
            .bind(case.is_default)
            .bind(case.created_at)
            .execute(&*self.db)
            .await;

            match inserted {
                Ok(_) => {
                    info!("created case {} ({})", case.name, case.container_name);
                    return Ok(case);
                }
                Err(err) if is_unique_violation(&err) && err.to_string().contains("secret") => {
                    last_err = Some(CaseError::Sqlx(err));
                }
                Err(err) => {
                    last_err = Some(if is_unique_violation(&err) {
                        CaseError::Conflict(format!("A case named `{name}` already exists."))
                    } else {
                        CaseError::Sqlx(err)
                    });
                    break;
                }
            }
        }

        if let Err(err) = self.store.delete_container(&container_name).await {
            warn!(
                "failed to remove container {} after case insert failure: {}",
                container_name, err
            );
        }
        Err(last_err.unwrap_or_else(|| CaseError::Conflict("Could not allocate a secret.".into())))
    }
}

#[async_trait]
impl CaseDirectory for CaseService {
    async fn container_for_secret(&self, secret: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT container_name FROM cases WHERE secret = ?")
            .bind(secret)
            .fetch_optional(&*self.db)
            .await
    }
}
