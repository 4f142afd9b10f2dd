//! Reaction and subscription state. Each toggle runs inside one transaction
//! and mutates membership with plain DELETE/INSERT set operations, so two
//! concurrent requests can not produce duplicate entries or leave a user in
//! both the like and dislike sets of a podcast.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct LikeState {
    pub is_liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct DislikeState {
    pub is_disliked: bool,
    pub dislikes_count: i64,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionState {
    pub is_subscribed: bool,
    pub subscribers_count: i64,
}

/// Flip like membership. Adding a like removes any standing dislike, so the
/// two sets stay mutually exclusive per user.
pub async fn toggle_like(db: &PgPool, podcast_id: Uuid, user_id: Uuid) -> anyhow::Result<LikeState> {
    let mut tx = db.begin().await?;
    let removed = sqlx::query(
        r#"DELETE FROM podcast_likes WHERE podcast_id = $1 AND user_id = $2"#,
    )
    .bind(podcast_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let is_liked = removed == 0;
    if is_liked {
        sqlx::query(
            r#"DELETE FROM podcast_dislikes WHERE podcast_id = $1 AND user_id = $2"#,
        )
        .bind(podcast_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            INSERT INTO podcast_likes (podcast_id, user_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(podcast_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    let likes_count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM podcast_likes WHERE podcast_id = $1"#)
            .bind(podcast_id)
            .fetch_one(&mut *tx)
            .await?;
    tx.commit().await?;
    Ok(LikeState {
        is_liked,
        likes_count,
    })
}

/// Flip dislike membership; adding a dislike removes any standing like.
pub async fn toggle_dislike(
    db: &PgPool,
    podcast_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<DislikeState> {
    let mut tx = db.begin().await?;
    let removed = sqlx::query(
        r#"DELETE FROM podcast_dislikes WHERE podcast_id = $1 AND user_id = $2"#,
    )
    .bind(podcast_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let is_disliked = removed == 0;
    if is_disliked {
        sqlx::query(
            r#"DELETE FROM podcast_likes WHERE podcast_id = $1 AND user_id = $2"#,
        )
        .bind(podcast_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            INSERT INTO podcast_dislikes (podcast_id, user_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(podcast_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    let dislikes_count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM podcast_dislikes WHERE podcast_id = $1"#)
            .bind(podcast_id)
            .fetch_one(&mut *tx)
            .await?;
    let likes_count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM podcast_likes WHERE podcast_id = $1"#)
            .bind(podcast_id)
            .fetch_one(&mut *tx)
            .await?;
    tx.commit().await?;
    Ok(DislikeState {
        is_disliked,
        dislikes_count,
        likes_count,
    })
}

/// Flip the subscription edge between a subscriber and a channel. The edge
/// carries denormalized email/name for notification templating.
pub async fn toggle_subscribe(
    db: &PgPool,
    subscriber_id: Uuid,
    subscriber_email: &str,
    channel_id: Uuid,
    channel_name: &str,
) -> anyhow::Result<SubscriptionState> {
    let mut tx = db.begin().await?;
    let removed = sqlx::query(
        r#"DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2"#,
    )
    .bind(subscriber_id)
    .bind(channel_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let is_subscribed = removed == 0;
    if is_subscribed {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (subscriber_id, subscriber_email, channel_id, channel_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (subscriber_id, channel_id) DO NOTHING
            "#,
        )
        .bind(subscriber_id)
        .bind(subscriber_email)
        .bind(channel_id)
        .bind(channel_name)
        .execute(&mut *tx)
        .await?;
    }

    let subscribers_count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1"#)
            .bind(channel_id)
            .fetch_one(&mut *tx)
            .await?;
    tx.commit().await?;
    Ok(SubscriptionState {
        is_subscribed,
        subscribers_count,
    })
}

// ---- comments ----

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub podcast_ref: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

/// Comment joined with its author's public fields. The join is left-sided:
/// authors deleted after commenting come back as None.
#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub podcast_ref: String,
    pub body: String,
    pub created_at: OffsetDateTime,
    pub username: Option<String>,
    pub profile_picture: Option<String>,
}

pub async fn insert_comment(
    db: &PgPool,
    user_id: Uuid,
    podcast_ref: &str,
    body: &str,
) -> anyhow::Result<Comment> {
    let comment = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (user_id, podcast_ref, body)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, podcast_ref, body, created_at
        "#,
    )
    .bind(user_id)
    .bind(podcast_ref)
    .bind(body)
    .fetch_one(db)
    .await?;
    Ok(comment)
}

pub async fn list_comments(db: &PgPool, podcast_ref: &str) -> anyhow::Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query_as::<_, CommentWithAuthor>(
        r#"
        SELECT c.id, c.user_id, c.podcast_ref, c.body, c.created_at,
               u.username, u.profile_picture
        FROM comments c
        LEFT JOIN users u ON u.id = c.user_id
        WHERE c.podcast_ref = $1
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(podcast_ref)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
