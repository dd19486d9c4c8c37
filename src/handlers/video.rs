use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};

use crate::error::{ApiResponse, Result};
use crate::handlers::upload::UploadForm;
use crate::models::{
    Owner, PublishToggleResponse, PublishVideoRequest, UpdateVideoRequest, Video, VideoResponse,
};
use crate::services::VideoService;
use crate::AppState;

const MEDIA_FIELD: &str = "videoFile";
const THUMBNAIL_FIELD: &str = "thumbnail";

/// Publish a video
/// POST /api/v1/videos (multipart: videoFile, thumbnail, title, description, duration, views)
pub async fn publish_video(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<VideoResponse>>> {
    let spool_dir = state.config.spool_dir();
    let form = UploadForm::read(multipart, &[MEDIA_FIELD, THUMBNAIL_FIELD], &spool_dir).await?;

    let result: Result<Video> = async {
        let media = form.require_file(MEDIA_FIELD)?;
        let thumbnail = form.require_file(THUMBNAIL_FIELD)?;
        let req = PublishVideoRequest {
            title: form.text("title").unwrap_or_default().to_string(),
            description: form.text("description").unwrap_or_default().to_string(),
            duration: form.parse("duration")?.unwrap_or(0.0),
            views: form.parse("views")?,
        };

        VideoService::publish(
            &state.db,
            state.storage.provider(),
            &owner,
            media,
            thumbnail,
            req,
        )
        .await
    }
    .await;

    form.cleanup().await;

    let video = result?;
    Ok(Json(ApiResponse::success_with_message(
        VideoResponse::from(video),
        "Video published successfully",
    )))
}

/// Get a video
/// GET /api/v1/videos/:id
pub async fn get_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VideoResponse>>> {
    let video = VideoService::get_video(&state.db, &id).await?;
    Ok(Json(ApiResponse::success(VideoResponse::from(video))))
}

/// Edit title/description and optionally the thumbnail
/// PATCH /api/v1/videos/:id (multipart: title, description, thumbnail)
pub async fn update_video(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<VideoResponse>>> {
    let spool_dir = state.config.spool_dir();
    let form = UploadForm::read(multipart, &[THUMBNAIL_FIELD], &spool_dir).await?;

    let req = UpdateVideoRequest {
        title: form.text("title").map(str::to_string),
        description: form.text("description").map(str::to_string),
    };
    let result = VideoService::update_details(
        &state.db,
        state.storage.provider(),
        &owner,
        &id,
        req,
        form.file(THUMBNAIL_FIELD),
    )
    .await;

    form.cleanup().await;

    let video = result?;
    Ok(Json(ApiResponse::success_with_message(
        VideoResponse::from(video),
        "Details updated successfully",
    )))
}

/// Replace the thumbnail
/// PUT /api/v1/videos/:id/thumbnail (multipart: thumbnail)
pub async fn update_thumbnail(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<VideoResponse>>> {
    let spool_dir = state.config.spool_dir();
    let form = UploadForm::read(multipart, &[THUMBNAIL_FIELD], &spool_dir).await?;

    let result: Result<Video> = async {
        let thumbnail = form.require_file(THUMBNAIL_FIELD)?;
        VideoService::update_thumbnail(&state.db, state.storage.provider(), &owner, &id, thumbnail)
            .await
    }
    .await;

    form.cleanup().await;

    let video = result?;
    Ok(Json(ApiResponse::success(VideoResponse::from(video))))
}

/// Delete a video
/// DELETE /api/v1/videos/:id
pub async fn delete_video(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<VideoResponse>>> {
    let video = VideoService::delete_video(&state.db, &owner, &id).await?;
    Ok(Json(ApiResponse::success_with_message(
        VideoResponse::from(video),
        "Video deleted successfully",
    )))
}

/// Toggle publish status
/// PATCH /api/v1/videos/:id/publish
pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PublishToggleResponse>>> {
    let is_published = VideoService::toggle_publish(&state.db, &owner, &id).await?;
    Ok(Json(ApiResponse::success(PublishToggleResponse { is_published })))
}
