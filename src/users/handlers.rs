use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::AuthUser,
        otp::{self, OtpPurpose},
    },
    email,
    error::AppError,
    podcasts::{dto::PodcastItem, repo::Podcast},
    state::AppState,
    users::{
        cascade,
        dto::{
            DeleteAccountRequest, HistoryItem, HistoryPushRequest, ProfileResponse,
            PublicProfileResponse, PublicUserInfo,
        },
        repo::{self, User},
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile))
        .route("/:id/public-profile", get(public_profile))
        .route("/library/:id", post(toggle_library))
        .route("/history", post(add_history))
        .route("/delete-otp", post(delete_otp))
        .route("/delete", delete(delete_account))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let liked = Podcast::list_liked_by_user(&state.db, user_id).await?;

    let library_ids = repo::library_podcast_ids(&state.db, user_id).await?;
    let library = in_id_order(&state, &library_ids).await?;

    let history_rows = repo::list_history(&state.db, user_id).await?;
    let history_ids: Vec<Uuid> = history_rows.iter().map(|h| h.podcast_id).collect();
    let mut by_id: HashMap<Uuid, Podcast> = Podcast::list_by_ids(&state.db, &history_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let history = history_rows
        .into_iter()
        .filter_map(|h| {
            by_id.remove(&h.podcast_id).map(|p| HistoryItem {
                podcast: p.into(),
                progress: h.progress_seconds,
                played_at: h.played_at,
            })
        })
        .collect();

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        phone: user.phone,
        profile_picture: user.profile_picture,
        is_verified: user.is_verified,
        created_at: user.created_at,
        liked_podcasts: liked.into_iter().map(PodcastItem::from).collect(),
        library,
        history,
    }))
}

async fn in_id_order(state: &AppState, ids: &[Uuid]) -> Result<Vec<PodcastItem>, AppError> {
    let mut by_id: HashMap<Uuid, Podcast> = Podcast::list_by_ids(&state.db, ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    Ok(ids
        .iter()
        .filter_map(|id| by_id.remove(id).map(PodcastItem::from))
        .collect())
}

#[instrument(skip(state))]
pub async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicProfileResponse>, AppError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let subscribers_count = User::subscriber_count(&state.db, id).await?;
    let podcasts = Podcast::list_by_user(&state.db, id).await?;

    Ok(Json(PublicProfileResponse {
        user: PublicUserInfo {
            id: user.id,
            username: user.username,
            profile_picture: user.profile_picture,
            email: user.email,
            is_verified: user.is_verified,
            subscribers_count,
        },
        podcasts: podcasts.into_iter().map(PodcastItem::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn toggle_library(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(podcast_ref): Path<String>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &podcast_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;
    let library = repo::toggle_library(&state.db, user_id, podcast.id).await?;
    Ok(Json(library))
}

#[instrument(skip(state, payload))]
pub async fn add_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<HistoryPushRequest>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &payload.podcast_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;

    repo::push_history(&state.db, user_id, podcast.id, payload.progress.max(0)).await?;

    let rows = repo::list_history(&state.db, user_id).await?;
    let history = rows
        .into_iter()
        .map(|h| {
            json!({
                "podcastId": h.podcast_id,
                "progress": h.progress_seconds,
                "playedAt": h.played_at,
            })
        })
        .collect();
    Ok(Json(history))
}

#[instrument(skip(state))]
pub async fn delete_otp(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let code = otp::generate_code();
    User::set_otp(
        &state.db,
        user.id,
        &code,
        OtpPurpose::Deletion,
        otp::expiry_from(OffsetDateTime::now_utc()),
    )
    .await?;

    email::send_deletion_code(state.mailer.as_ref(), &user.email, &code)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "deletion otp dispatch failed");
            AppError::Internal(e)
        })?;

    Ok(Json(json!({ "message": "OTP sent to your email" })))
}

#[instrument(skip(state, payload))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = cascade::execute(&state, user_id, &payload.otp, &payload.reason).await?;
    info!(
        user_id = %user_id,
        files_removed = outcome.files_removed,
        podcasts_removed = outcome.podcasts_removed,
        "account deletion completed"
    );
    Ok(Json(json!({
        "message": "Account, uploaded content, and data deleted successfully"
    })))
}
