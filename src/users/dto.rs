use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::podcasts::dto::PodcastItem;

/// Full private profile, with reaction/library/history lists populated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub profile_picture: String,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
    pub liked_podcasts: Vec<PodcastItem>,
    pub library: Vec<PodcastItem>,
    pub history: Vec<HistoryItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub podcast: PodcastItem,
    pub progress: i32,
    pub played_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserInfo {
    pub id: Uuid,
    pub username: String,
    pub profile_picture: String,
    pub email: String,
    pub is_verified: bool,
    pub subscribers_count: i64,
}

#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    pub user: PublicUserInfo,
    pub podcasts: Vec<PodcastItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPushRequest {
    pub podcast_id: String,
    #[serde(default)]
    pub progress: i32,
}

/// Body for the final deletion call. Fields default to empty so presence
/// is checked by the cascade itself, before any other work.
#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub reason: String,
}
