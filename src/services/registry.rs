use chrono::Utc;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{AssetKind, ContentDigest, Registration, StoredAsset};

/// Asset registry: maps (kind, digest) to a storage reference
pub struct AssetRegistry;

impl AssetRegistry {
    /// Look up an asset with exactly this content
    pub async fn find_by_digest(
        db: &Database,
        kind: AssetKind,
        digest: &ContentDigest,
    ) -> Result<Option<StoredAsset>> {
        let asset: Option<StoredAsset> =
            sqlx::query_as("SELECT * FROM stored_assets WHERE kind = ? AND digest = ?")
                .bind(kind.as_str())
                .bind(digest)
                .fetch_optional(db.pool())
                .await?;

        Ok(asset)
    }

    /// Record an uploaded asset.
    ///
    /// Insert-if-absent in one statement. When another request registered
    /// the same content first, its row is returned as `Registration::Existing`
    /// and the caller's `storage_ref` is dropped.
    pub async fn register(
        db: &Database,
        kind: AssetKind,
        digest: &ContentDigest,
        storage_ref: &str,
        size: i64,
    ) -> Result<Registration> {
        let now = Utc::now().to_rfc3339();

        let inserted = sqlx::query(
            r#"
            INSERT INTO stored_assets (kind, digest, storage_ref, size, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (kind, digest) DO NOTHING
            "#,
        )
        .bind(kind.as_str())
        .bind(digest)
        .bind(storage_ref)
        .bind(size)
        .bind(&now)
        .execute(db.pool())
        .await?
        .rows_affected()
            == 1;

        let asset = Self::find_by_digest(db, kind, digest).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "Stored asset {} {} vanished after registration",
                kind.as_str(),
                digest
            ))
        })?;

        if inserted {
            tracing::info!("Registered {} asset {}", kind.as_str(), digest.short());
            Ok(Registration::Created(asset))
        } else {
            tracing::info!(
                "{} asset {} already registered, discarding {}",
                kind.as_str(),
                digest.short(),
                storage_ref
            );
            Ok(Registration::Existing(asset))
        }
    }
}
