use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    podcasts::{
        dto::{EpisodeItem, PodcastDetail, PodcastItem, PodcastListEntry, UpdatePodcastRequest},
        repo::{Episode, MediaType, NewPodcast, Podcast},
    },
    state::AppState,
    uploads::{self, MediaKind},
    users::repo::User,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_podcasts))
        .route("/my-podcasts", get(my_podcasts))
        .route("/:id", get(get_podcast))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_podcast))
        .route("/:id", put(update_podcast).delete(delete_podcast))
        // room for large video uploads
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024 * 1024))
}

#[instrument(skip(state))]
pub async fn list_podcasts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PodcastListEntry>>, AppError> {
    let rows = Podcast::list_all(&state.db).await?;
    Ok(Json(rows.into_iter().map(PodcastListEntry::from).collect()))
}

#[instrument(skip(state))]
pub async fn my_podcasts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PodcastItem>>, AppError> {
    let rows = Podcast::list_by_user(&state.db, user_id).await?;
    Ok(Json(rows.into_iter().map(PodcastItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_podcast(
    State(state): State<AppState>,
    Path(podcast_ref): Path<String>,
) -> Result<Json<PodcastDetail>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &podcast_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;

    let episodes = Episode::list_by_podcast(&state.db, podcast.id).await?;
    let likes_count = Podcast::like_count(&state.db, podcast.id).await?;
    let dislikes_count = Podcast::dislike_count(&state.db, podcast.id).await?;

    Ok(Json(PodcastDetail {
        podcast: podcast.into(),
        likes_count,
        dislikes_count,
        episodes: episodes.into_iter().map(EpisodeItem::from).collect(),
    }))
}

/// Multipart form: `audio`, `video`, `image` file fields (one each) plus
/// `title`, `description`, `category`, `language` text fields.
#[instrument(skip(state, multipart))]
pub async fn create_podcast(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PodcastDetail>), AppError> {
    let owner = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut category: Option<String> = None;
    let mut language: Option<String> = None;
    let mut audio_url: Option<String> = None;
    let mut video_url: Option<String> = None;
    let mut image_url: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" | "description" | "category" | "language" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read {name}: {e}")))?;
                match name.as_str() {
                    "title" => title = Some(value),
                    "description" => description = Some(value),
                    "category" => category = Some(value),
                    _ => language = Some(value),
                }
            }
            "audio" | "video" | "image" => {
                let Some(kind) = MediaKind::from_field(&name) else {
                    continue;
                };
                let original = field.file_name().unwrap_or("upload").to_string();
                if !uploads::extension_allowed(&original, uploads::MEDIA_EXTENSIONS) {
                    warn!(file = %original, "rejected upload extension");
                    return Err(AppError::Validation("File type not supported!".into()));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read {name}: {e}")))?;
                let stored =
                    uploads::store_media(&state.config.upload_root, kind, &original, &data).await?;
                match kind {
                    MediaKind::Audio => audio_url = Some(stored),
                    MediaKind::Video => video_url = Some(stored),
                    MediaKind::Thumbnail => image_url = Some(stored),
                }
            }
            _ => {}
        }
    }

    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Title is required".into()))?;

    let media_type = if video_url.is_some() {
        MediaType::Video
    } else {
        MediaType::Audio
    };

    let (podcast, episode) = Podcast::create_with_first_episode(
        &state.db,
        NewPodcast {
            title: title.trim(),
            description: description.as_deref(),
            category: category.as_deref(),
            language: language.as_deref(),
            media_type,
            user_id: owner.id,
            author: &owner.username,
            image: image_url.as_deref(),
            audio_url: audio_url.as_deref(),
            video_url: video_url.as_deref(),
        },
    )
    .await?;

    info!(podcast_id = %podcast.id, user_id = %owner.id, "podcast created");
    Ok((
        StatusCode::CREATED,
        Json(PodcastDetail {
            podcast: podcast.into(),
            likes_count: 0,
            dislikes_count: 0,
            episodes: vec![episode.into()],
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_podcast(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(podcast_ref): Path<String>,
    Json(payload): Json<UpdatePodcastRequest>,
) -> Result<Json<PodcastItem>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &podcast_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;

    if podcast.user_id != Some(user_id) {
        return Err(AppError::Auth("Not authorized".into()));
    }

    let updated = Podcast::update_details(
        &state.db,
        podcast.id,
        payload.title.as_deref(),
        payload.description.as_deref(),
        payload.category.as_deref(),
        payload.language.as_deref(),
    )
    .await?;

    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_podcast(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(podcast_ref): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &podcast_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;

    if podcast.user_id != Some(user_id) {
        return Err(AppError::Auth("Not authorized".into()));
    }

    Podcast::delete(&state.db, podcast.id).await?;
    info!(podcast_id = %podcast.id, user_id = %user_id, "podcast removed");
    Ok(Json(json!({ "message": "Podcast removed" })))
}
