use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ContentDigest;

/// Published video record
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    pub id: String,
    pub owner_id: String,
    pub video_file: String,
    pub video_hash: ContentDigest,
    pub thumbnail: String,
    pub thumbnail_hash: ContentDigest,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Video response, the media digest stays internal
#[derive(Debug, Clone, Serialize)]
pub struct VideoResponse {
    pub id: String,
    pub owner_id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub thumbnail_hash: ContentDigest,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            owner_id: video.owner_id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            thumbnail_hash: video.thumbnail_hash,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

/// Caller-supplied metadata for a new video
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishVideoRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: f64,
    pub views: Option<i64>,
}

/// Title/description edit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl UpdateVideoRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Publish toggle response
#[derive(Debug, Serialize)]
pub struct PublishToggleResponse {
    pub is_published: bool,
}
