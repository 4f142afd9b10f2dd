use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    email,
    error::AppError,
    interactions::{
        dto::{
            CommentAuthor, CommentRequest, CommentResponse, DislikeResponse, LikeResponse,
            SubscribeResponse, ViewResponse,
        },
        repo,
    },
    podcasts::repo::Podcast,
    state::AppState,
    users::repo::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/subscribe/:creatorId", post(toggle_subscribe))
        .route("/like/:podcastId", post(toggle_like))
        .route("/dislike/:podcastId", post(toggle_dislike))
        .route("/view/:podcastId", post(increment_view))
        .route("/comment/:podcastId", post(add_comment))
        .route("/comments/:podcastId", get(list_comments))
}

#[instrument(skip(state))]
pub async fn toggle_subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(creator_id): Path<Uuid>,
) -> Result<Json<SubscribeResponse>, AppError> {
    if creator_id == user_id {
        return Err(AppError::Validation("Cannot subscribe to yourself".into()));
    }

    let creator = User::find_by_id(&state.db, creator_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let outcome = repo::toggle_subscribe(
        &state.db,
        user.id,
        &user.email,
        creator.id,
        &creator.username,
    )
    .await?;

    if outcome.is_subscribed {
        // fire-and-forget: the channel owner's notice never blocks the toggle
        let mailer = state.mailer.clone();
        let to = creator.email.clone();
        let subscriber_name = user.username.clone();
        tokio::spawn(async move {
            email::notify_new_subscriber(mailer.as_ref(), &to, &subscriber_name).await;
        });
    }

    info!(
        subscriber = %user.id,
        channel = %creator.id,
        subscribed = outcome.is_subscribed,
        "subscription toggled"
    );
    Ok(Json(SubscribeResponse {
        message: if outcome.is_subscribed {
            "Subscribed".into()
        } else {
            "Unsubscribed".into()
        },
        is_subscribed: outcome.is_subscribed,
        subscribers_count: outcome.subscribers_count,
    }))
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(podcast_ref): Path<String>,
) -> Result<Json<LikeResponse>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &podcast_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;

    let outcome = repo::toggle_like(&state.db, podcast.id, user_id).await?;
    Ok(Json(LikeResponse {
        is_liked: outcome.is_liked,
        likes_count: outcome.likes_count,
    }))
}

#[instrument(skip(state))]
pub async fn toggle_dislike(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(podcast_ref): Path<String>,
) -> Result<Json<DislikeResponse>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &podcast_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;

    let outcome = repo::toggle_dislike(&state.db, podcast.id, user_id).await?;
    Ok(Json(DislikeResponse {
        is_disliked: outcome.is_disliked,
        dislikes_count: outcome.dislikes_count,
        likes_count: outcome.likes_count,
    }))
}

#[instrument(skip(state))]
pub async fn increment_view(
    State(state): State<AppState>,
    Path(podcast_ref): Path<String>,
) -> Result<Json<ViewResponse>, AppError> {
    let podcast = Podcast::find_by_ref(&state.db, &podcast_ref)
        .await?
        .ok_or_else(|| AppError::NotFound("Podcast not found".into()))?;

    let views = Podcast::increment_views(&state.db, podcast.id).await?;
    Ok(Json(ViewResponse { views }))
}

#[instrument(skip(state, payload))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(podcast_ref): Path<String>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), AppError> {
    if payload.text.trim().is_empty() {
        return Err(AppError::Validation("Comment text required".into()));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let comment = repo::insert_comment(&state.db, user.id, &podcast_ref, payload.text.trim()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment.id,
            podcast_id: comment.podcast_ref,
            text: comment.body,
            created_at: comment.created_at,
            user: Some(CommentAuthor {
                id: user.id,
                username: user.username,
                profile_picture: user.profile_picture,
            }),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(podcast_ref): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, AppError> {
    let rows = repo::list_comments(&state.db, &podcast_ref).await?;
    let comments = rows
        .into_iter()
        .map(|c| CommentResponse {
            id: c.id,
            podcast_id: c.podcast_ref,
            text: c.body,
            created_at: c.created_at,
            user: c.username.map(|username| CommentAuthor {
                id: c.user_id,
                username,
                profile_picture: c.profile_picture.unwrap_or_default(),
            }),
        })
        .collect();
    Ok(Json(comments))
}
