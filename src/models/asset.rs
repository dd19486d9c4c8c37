use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Lowercase hex SHA-256 of a file's exact bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content class of a stored asset. Digests are never matched across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Media,
    Thumbnail,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Media => "media",
            AssetKind::Thumbnail => "thumbnail",
        }
    }
}

/// Content already persisted in blob storage, one row per (kind, digest)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct StoredAsset {
    pub kind: String,
    pub digest: ContentDigest,
    pub storage_ref: String,
    pub size: i64,
    pub created_at: String,
}

/// Outcome of an atomic registration attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// This call inserted the row
    Created(StoredAsset),
    /// Another request registered the same content first
    Existing(StoredAsset),
}

impl Registration {
    pub fn into_asset(self) -> StoredAsset {
        match self {
            Registration::Created(asset) | Registration::Existing(asset) => asset,
        }
    }
}
