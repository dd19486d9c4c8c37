//! Upload/reuse decisions for a (media, thumbnail) pair.
//!
//! Everything here is pure: inputs are lookups and registration outcomes,
//! outputs are plans or resolved assets. The I/O lives in `VideoService`.
//!
//! Media is a duplicate when a published record already references its
//! digest. A registered media asset with no record (left behind by a failed
//! or cancelled publish, or by a deleted record) is reused instead.
//!
//! | media in a record | media asset | thumb asset | plan                           |
//! |-------------------|-------------|-------------|--------------------------------|
//! | yes               | any         | any         | reject with `DuplicateMedia`   |
//! | no                | Some        | Some        | reuse media, reuse thumbnail   |
//! | no                | Some        | None        | reuse media, upload thumbnail  |
//! | no                | None        | Some        | upload media, reuse thumbnail  |
//! | no                | None        | None        | upload media, upload thumbnail |

use crate::error::{AppError, Result};
use crate::models::{ContentDigest, Registration, StoredAsset};

/// What to do with one asset of the pair
#[derive(Debug, Clone, PartialEq)]
pub enum AssetAction {
    /// Content is already stored; point at it without uploading
    Reuse(StoredAsset),
    /// New content; upload and register
    Upload,
}

impl AssetAction {
    fn from_match(found: Option<StoredAsset>) -> Self {
        match found {
            Some(asset) => AssetAction::Reuse(asset),
            None => AssetAction::Upload,
        }
    }
}

/// Plan for a publish request that passed the duplicate check
#[derive(Debug, Clone, PartialEq)]
pub struct PublishPlan {
    pub media: AssetAction,
    pub thumbnail: AssetAction,
}

/// Combine the independent lookups into a plan.
/// Media already behind a record rejects the whole request, whatever the
/// asset lookups found.
pub fn plan_publish(
    media_in_use: bool,
    media_match: Option<StoredAsset>,
    thumb_match: Option<StoredAsset>,
) -> Result<PublishPlan> {
    if media_in_use {
        return Err(AppError::DuplicateMedia);
    }

    Ok(PublishPlan {
        media: AssetAction::from_match(media_match),
        thumbnail: AssetAction::from_match(thumb_match),
    })
}

/// Plan a thumbnail replacement on a single record.
/// Re-sending the record's current thumbnail is a no-op edit, even though the
/// registry would also report it as a match.
pub fn plan_thumbnail_update(
    current: &ContentDigest,
    candidate: &ContentDigest,
    thumb_match: Option<StoredAsset>,
) -> Result<AssetAction> {
    if current == candidate {
        return Err(AppError::NoOpEdit(
            "Can't upload the same thumbnail again".to_string(),
        ));
    }

    Ok(AssetAction::from_match(thumb_match))
}

/// Settle a registration after upload.
/// Losing the registration race means another request stored the same bytes
/// first; its row is the one to reference. Whether the media ends up behind
/// two records is decided by the record insert, not here.
pub fn settle(registration: Registration) -> StoredAsset {
    registration.into_asset()
}
