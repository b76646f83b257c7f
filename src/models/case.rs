//! Represents a case: a tenant-like unit of file storage gated by a secret.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Number of digit groups in an upload secret.
const SECRET_GROUPS: usize = 4;
/// Digits per group in an upload secret.
const SECRET_GROUP_LEN: usize = 4;

/// A case row as persisted in SQLite.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Case {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Unique display name.
    pub name: String,

    /// Object-store container backing this case (`case-xxxxxxxx`).
    pub container_name: String,

    /// Opaque upload credential, `dddd-dddd-dddd-dddd`.
    pub secret: String,

    /// The default case is provisioned at startup and cannot be deleted.
    pub is_default: bool,

    pub created_at: DateTime<Utc>,
}

/// Returns true if `secret` is exactly four hyphen-separated groups of
/// four ASCII digits.
pub fn is_valid_secret(secret: &str) -> bool {
    let groups: Vec<&str> = secret.split('-').collect();
    groups.len() == SECRET_GROUPS
        && groups
            .iter()
            .all(|g| g.len() == SECRET_GROUP_LEN && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Generate a fresh upload secret in grouped-decimal form.
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    (0..SECRET_GROUPS)
        .map(|_| format!("{:04}", rng.random_range(0..10_000u32)))
        .collect::<Vec<_>>()
        .join("-")
}

/// Allocate a container name for a new case: `case-` followed by eight
/// lowercase hex characters.
pub fn new_container_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("case-{}", &id[..8])
}
