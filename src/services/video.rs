use chrono::Utc;
use std::path::Path;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    AssetKind, ContentDigest, Owner, PublishVideoRequest, Registration, StoredAsset,
    UpdateVideoRequest, Video,
};
use crate::services::dedup::{self, AssetAction};
use crate::services::fingerprint::fingerprint;
use crate::services::AssetRegistry;
use crate::storage::StorageProvider;

/// Video service: publish workflow and per-record edits
pub struct VideoService;

impl VideoService {
    /// Publish a (media, thumbnail) pair.
    ///
    /// Media already referenced by a record is rejected before anything is
    /// uploaded. Each asset is reused when its content is already stored,
    /// otherwise uploaded, media first. The record is inserted last, in a
    /// single statement, so a failure at any step leaves no record behind.
    /// The unique index on `videos.video_hash` settles two requests racing
    /// with the same media.
    pub async fn publish(
        db: &Database,
        uploader: &dyn StorageProvider,
        owner: &Owner,
        media_path: &Path,
        thumbnail_path: &Path,
        req: PublishVideoRequest,
    ) -> Result<Video> {
        Self::validate_publish(&req)?;

        let (media_digest, thumb_digest) =
            tokio::try_join!(fingerprint(media_path), fingerprint(thumbnail_path))?;

        let (media_in_use, media_match, thumb_match) = tokio::try_join!(
            Self::media_in_use(db, &media_digest),
            AssetRegistry::find_by_digest(db, AssetKind::Media, &media_digest),
            AssetRegistry::find_by_digest(db, AssetKind::Thumbnail, &thumb_digest),
        )?;

        let plan = dedup::plan_publish(media_in_use, media_match, thumb_match).map_err(|e| {
            tracing::info!("Rejected publish of duplicate media {}", media_digest.short());
            e
        })?;

        let media = Self::resolve_asset(
            db,
            uploader,
            plan.media,
            AssetKind::Media,
            &media_digest,
            media_path,
        )
        .await?;

        let thumbnail = Self::resolve_asset(
            db,
            uploader,
            plan.thumbnail,
            AssetKind::Thumbnail,
            &thumb_digest,
            thumbnail_path,
        )
        .await?;

        let video_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO videos (id, owner_id, video_file, video_hash, thumbnail, thumbnail_hash,
                                title, description, duration, views, is_published, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&video_id)
        .bind(&owner.id)
        .bind(&media.storage_ref)
        .bind(&media.digest)
        .bind(&thumbnail.storage_ref)
        .bind(&thumbnail.digest)
        .bind(req.title.trim())
        .bind(&req.description)
        .bind(req.duration)
        .bind(req.views.unwrap_or(0))
        .bind(&now)
        .bind(&now)
        .execute(db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                tracing::info!(
                    "Media {} was published by a concurrent request",
                    media.digest.short()
                );
                AppError::DuplicateMedia
            }
            e => AppError::Database(e),
        })?;

        tracing::info!(
            "Published video {} for owner {} (media {}, thumbnail {})",
            video_id,
            owner.id,
            media.digest.short(),
            thumbnail.digest.short()
        );

        Self::get_video(db, &video_id).await
    }

    /// Replace a record's thumbnail. Only the thumbnail reference and digest
    /// change; sending the current thumbnail again is a `NoOpEdit`.
    pub async fn update_thumbnail(
        db: &Database,
        uploader: &dyn StorageProvider,
        owner: &Owner,
        video_id: &str,
        thumbnail_path: &Path,
    ) -> Result<Video> {
        let video = Self::get_owned_video(db, owner, video_id).await?;
        let thumbnail = Self::prepare_thumbnail(db, uploader, &video, thumbnail_path).await?;

        Self::apply_edit(db, &video, None, None, Some(&thumbnail)).await
    }

    /// Edit title/description and optionally the thumbnail, in one update
    pub async fn update_details(
        db: &Database,
        uploader: &dyn StorageProvider,
        owner: &Owner,
        video_id: &str,
        req: UpdateVideoRequest,
        thumbnail_path: Option<&Path>,
    ) -> Result<Video> {
        if req.is_empty() && thumbnail_path.is_none() {
            return Err(AppError::BadRequest("Nothing to update".to_string()));
        }
        if let Some(title) = &req.title {
            if title.trim().is_empty() {
                return Err(AppError::BadRequest("Title cannot be empty".to_string()));
            }
        }

        let video = Self::get_owned_video(db, owner, video_id).await?;

        let thumbnail = match thumbnail_path {
            Some(path) => Some(Self::prepare_thumbnail(db, uploader, &video, path).await?),
            None => None,
        };

        let title = req.title.as_deref().map(str::trim);
        Self::apply_edit(db, &video, title, req.description.as_deref(), thumbnail.as_ref()).await
    }

    /// Get a video by ID
    pub async fn get_video(db: &Database, video_id: &str) -> Result<Video> {
        let video: Video = sqlx::query_as("SELECT * FROM videos WHERE id = ?")
            .bind(video_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("No such video exists".to_string()))?;

        Ok(video)
    }

    /// Delete a video record. Stored assets stay registered.
    pub async fn delete_video(db: &Database, owner: &Owner, video_id: &str) -> Result<Video> {
        let video = Self::get_owned_video(db, owner, video_id).await?;

        let deleted = sqlx::query("DELETE FROM videos WHERE id = ? AND owner_id = ?")
            .bind(&video.id)
            .bind(&owner.id)
            .execute(db.pool())
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("No such video exists".to_string()));
        }

        tracing::info!("Deleted video {} for owner {}", video.id, owner.id);
        Ok(video)
    }

    /// Flip the published flag, returning the new state
    pub async fn toggle_publish(db: &Database, owner: &Owner, video_id: &str) -> Result<bool> {
        Self::get_owned_video(db, owner, video_id).await?;

        let now = Utc::now().to_rfc3339();
        let is_published: bool = sqlx::query_scalar(
            "UPDATE videos SET is_published = NOT is_published, updated_at = ? WHERE id = ? RETURNING is_published",
        )
        .bind(&now)
        .bind(video_id)
        .fetch_optional(db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound("No such video exists".to_string()))?;

        Ok(is_published)
    }

    async fn get_owned_video(db: &Database, owner: &Owner, video_id: &str) -> Result<Video> {
        let video = Self::get_video(db, video_id).await?;
        if !owner.owns(&video.owner_id) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        Ok(video)
    }

    fn validate_publish(req: &PublishVideoRequest) -> Result<()> {
        if req.title.trim().is_empty() {
            return Err(AppError::BadRequest("Title is required".to_string()));
        }
        if !req.duration.is_finite() || req.duration < 0.0 {
            return Err(AppError::BadRequest("Invalid duration".to_string()));
        }
        if matches!(req.views, Some(v) if v < 0) {
            return Err(AppError::BadRequest("Invalid views".to_string()));
        }
        Ok(())
    }

    /// Fingerprint a replacement thumbnail and resolve it to a stored asset
    async fn prepare_thumbnail(
        db: &Database,
        uploader: &dyn StorageProvider,
        video: &Video,
        thumbnail_path: &Path,
    ) -> Result<StoredAsset> {
        let digest = fingerprint(thumbnail_path).await?;
        let thumb_match = AssetRegistry::find_by_digest(db, AssetKind::Thumbnail, &digest).await?;
        let action = dedup::plan_thumbnail_update(&video.thumbnail_hash, &digest, thumb_match)?;

        Self::resolve_asset(db, uploader, action, AssetKind::Thumbnail, &digest, thumbnail_path)
            .await
    }

    /// Whether a record already references this media
    async fn media_in_use(db: &Database, digest: &ContentDigest) -> Result<bool> {
        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE video_hash = ?)")
                .bind(digest)
                .fetch_one(db.pool())
                .await?;
        Ok(in_use)
    }

    async fn resolve_asset(
        db: &Database,
        uploader: &dyn StorageProvider,
        action: AssetAction,
        kind: AssetKind,
        digest: &ContentDigest,
        local_path: &Path,
    ) -> Result<StoredAsset> {
        match action {
            AssetAction::Reuse(asset) => {
                tracing::info!("{} {} already stored, reusing", kind.as_str(), digest.short());
                Ok(asset)
            }
            AssetAction::Upload => Self::upload_and_register(db, uploader, kind, digest, local_path)
                .await
                .map(dedup::settle),
        }
    }

    /// Push new content to storage, then record it in the registry
    async fn upload_and_register(
        db: &Database,
        uploader: &dyn StorageProvider,
        kind: AssetKind,
        digest: &ContentDigest,
        local_path: &Path,
    ) -> Result<Registration> {
        let size = tokio::fs::metadata(local_path).await?.len() as i64;

        let storage_ref = uploader.upload(local_path).await?;
        tracing::debug!(
            "Uploaded {} {} via {} to {}",
            kind.as_str(),
            digest.short(),
            uploader.storage_type(),
            storage_ref
        );

        AssetRegistry::register(db, kind, digest, &storage_ref, size).await
    }

    /// Single conditional update. A thumbnail change is keyed on the digest
    /// read earlier so a concurrent thumbnail change is reported instead of
    /// overwritten. Title/description edits are not guarded.
    async fn apply_edit(
        db: &Database,
        video: &Video,
        title: Option<&str>,
        description: Option<&str>,
        thumbnail: Option<&StoredAsset>,
    ) -> Result<Video> {
        let now = Utc::now().to_rfc3339();
        let expected_thumbnail = thumbnail.map(|_| &video.thumbnail_hash);

        let updated = sqlx::query(
            r#"
            UPDATE videos
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                thumbnail = COALESCE(?, thumbnail),
                thumbnail_hash = COALESCE(?, thumbnail_hash),
                updated_at = ?
            WHERE id = ? AND (? IS NULL OR thumbnail_hash = ?)
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(thumbnail.map(|t| t.storage_ref.as_str()))
        .bind(thumbnail.map(|t| &t.digest))
        .bind(&now)
        .bind(&video.id)
        .bind(expected_thumbnail)
        .bind(expected_thumbnail)
        .execute(db.pool())
        .await?
        .rows_affected();

        if updated == 0 {
            // Gone, or edited underneath us
            Self::get_video(db, &video.id).await?;
            return Err(AppError::Conflict(
                "Video was modified concurrently, retry the edit".to_string(),
            ));
        }

        Self::get_video(db, &video.id).await
    }
}
