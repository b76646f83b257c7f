//! Manifest entries describing the files logically present in a container.

use crate::services::hasher::ContentHash;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One entry in a container's `.blobinventory` manifest.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Stored object key.
    pub name: String,

    /// Digest of the payload as received.
    pub unzipped_hash: ContentHash,

    /// Digest of the payload as stored. Equal to `unzipped_hash` when the
    /// payload was stored without wrapping.
    pub zipped_hash: ContentHash,

    /// Byte length of the payload as received.
    pub size: u64,

    #[serde(with = "utc_z")]
    pub upload_date: DateTime<Utc>,
}

impl FileRecord {
    /// A record stamped with the current time at the precision the manifest
    /// keeps, so a saved and reloaded record compares equal.
    pub fn new(
        name: impl Into<String>,
        unzipped_hash: ContentHash,
        zipped_hash: ContentHash,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            unzipped_hash,
            zipped_hash,
            size,
            upload_date: Utc::now().trunc_subsecs(6),
        }
    }
}

/// ISO-8601 timestamps in UTC with a literal `Z` suffix.
mod utc_z {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
