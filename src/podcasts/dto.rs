use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::podcasts::repo::{Episode, MediaType, Podcast, PodcastWithOwner};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastItem {
    pub id: Uuid,
    pub legacy_id: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub user_id: Option<Uuid>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub language: String,
    pub media_type: MediaType,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub views: i64,
    pub rating: Option<f64>,
    pub created_at: OffsetDateTime,
}

impl From<Podcast> for PodcastItem {
    fn from(p: Podcast) -> Self {
        Self {
            id: p.id,
            legacy_id: p.legacy_id,
            title: p.title,
            author: p.author,
            user_id: p.user_id,
            description: p.description,
            image: p.image,
            category: p.category,
            language: p.language,
            media_type: p.media_type,
            audio_url: p.audio_url,
            video_url: p.video_url,
            views: p.views,
            rating: p.rating,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerInfo {
    pub username: String,
    pub profile_picture: String,
}

#[derive(Debug, Serialize)]
pub struct PodcastListEntry {
    #[serde(flatten)]
    pub podcast: PodcastItem,
    pub user: Option<OwnerInfo>,
}

impl From<PodcastWithOwner> for PodcastListEntry {
    fn from(row: PodcastWithOwner) -> Self {
        let user = row.owner_username.map(|username| OwnerInfo {
            username,
            profile_picture: row.owner_profile_picture.unwrap_or_default(),
        });
        Self {
            podcast: PodcastItem {
                id: row.id,
                legacy_id: row.legacy_id,
                title: row.title,
                author: row.author,
                user_id: row.user_id,
                description: row.description,
                image: row.image,
                category: row.category,
                language: row.language,
                media_type: row.media_type,
                audio_url: row.audio_url,
                video_url: row.video_url,
                views: row.views,
                rating: row.rating,
                created_at: row.created_at,
            },
            user,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeItem {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub published: Option<String>,
    pub episode_number: Option<i32>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
}

impl From<Episode> for EpisodeItem {
    fn from(e: Episode) -> Self {
        Self {
            id: e.id,
            title: e.title,
            description: e.description,
            duration: e.duration,
            published: e.published,
            episode_number: e.episode_number,
            audio_url: e.audio_url,
            video_url: e.video_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastDetail {
    #[serde(flatten)]
    pub podcast: PodcastItem,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub episodes: Vec<EpisodeItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePodcastRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
}
