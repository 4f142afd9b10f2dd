use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub is_liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DislikeResponse {
    pub is_disliked: bool,
    pub dislikes_count: i64,
    pub likes_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub message: String,
    pub is_subscribed: bool,
    pub subscribers_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub views: i64,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub id: Uuid,
    pub username: String,
    pub profile_picture: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub podcast_id: String,
    pub text: String,
    pub created_at: OffsetDateTime,
    /// None when the author's account no longer exists.
    pub user: Option<CommentAuthor>,
}
