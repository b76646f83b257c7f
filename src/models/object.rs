//! Represents an object (blob) stored in a case container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Index entry for a single stored object.
///
/// The struct describes the payload; the bytes themselves live on disk
/// (or in memory for the test store).
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Name of the container this object lives in.
    pub container: String,

    /// Flat object key within the container.
    pub key: String,

    /// Size of the stored payload in bytes.
    pub size_bytes: i64,

    /// MD5 of the stored payload.
    pub etag: String,

    /// Timestamp of the last write.
    pub last_modified: DateTime<Utc>,
}
