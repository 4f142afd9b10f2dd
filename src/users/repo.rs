use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::otp::OtpPurpose;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub profile_picture: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub otp_code: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub otp_purpose: Option<OtpPurpose>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, phone, profile_picture,
                   is_verified, otp_code, otp_expires_at, otp_purpose, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, phone, profile_picture,
                   is_verified, otp_code, otp_expires_at, otp_purpose, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create an unverified user with a pending registration code.
    pub async fn create_unverified(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        phone: Option<&str>,
        otp_code: &str,
        otp_expires_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, phone, otp_code, otp_expires_at, otp_purpose)
            VALUES ($1, $2, $3, $4, $5, $6, 'registration')
            RETURNING id, username, email, password_hash, phone, profile_picture,
                      is_verified, otp_code, otp_expires_at, otp_purpose, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(phone)
        .bind(otp_code)
        .bind(otp_expires_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Overwrite an unverified user's details and reissue its registration
    /// code (the resend path for a repeated registration).
    pub async fn refresh_unverified(
        db: &PgPool,
        id: Uuid,
        username: &str,
        password_hash: &str,
        phone: Option<&str>,
        otp_code: &str,
        otp_expires_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = $2, password_hash = $3, phone = $4,
                   otp_code = $5, otp_expires_at = $6, otp_purpose = 'registration'
             WHERE id = $1
            RETURNING id, username, email, password_hash, phone, profile_picture,
                      is_verified, otp_code, otp_expires_at, otp_purpose, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .bind(phone)
        .bind(otp_code)
        .bind(otp_expires_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Bind a fresh code to the user, replacing any pending one.
    pub async fn set_otp(
        db: &PgPool,
        id: Uuid,
        code: &str,
        purpose: OtpPurpose,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET otp_code = $2, otp_purpose = $3, otp_expires_at = $4 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(purpose)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Consume the pending code and mark the account verified.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET is_verified = TRUE, otp_code = NULL, otp_expires_at = NULL, otp_purpose = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Set a new password and consume the pending reset code in one write.
    pub async fn reset_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, otp_code = NULL, otp_expires_at = NULL, otp_purpose = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_profile_picture(db: &PgPool, id: Uuid, stored: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET profile_picture = $2 WHERE id = $1"#)
            .bind(id)
            .bind(stored)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn subscriber_count(db: &PgPool, id: Uuid) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1"#)
                .bind(id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }
}

// ---- library ----

pub async fn library_podcast_ids(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT podcast_id FROM library_entries WHERE user_id = $1 ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(ids)
}

/// Flip library membership and return the updated podcast-id list.
pub async fn toggle_library(
    db: &PgPool,
    user_id: Uuid,
    podcast_id: Uuid,
) -> anyhow::Result<Vec<Uuid>> {
    let mut tx = db.begin().await?;
    let removed = sqlx::query(
        r#"DELETE FROM library_entries WHERE user_id = $1 AND podcast_id = $2"#,
    )
    .bind(user_id)
    .bind(podcast_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if removed == 0 {
        sqlx::query(
            r#"
            INSERT INTO library_entries (user_id, podcast_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(podcast_id)
        .execute(&mut *tx)
        .await?;
    }
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT podcast_id FROM library_entries WHERE user_id = $1 ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(ids)
}

// ---- listening history ----

#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub podcast_id: Uuid,
    pub progress_seconds: i32,
    pub played_at: OffsetDateTime,
}

/// Move the podcast to the top of the user's history (inserting if new)
/// and trim anything beyond the 50 most recent entries.
pub async fn push_history(
    db: &PgPool,
    user_id: Uuid,
    podcast_id: Uuid,
    progress_seconds: i32,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO history_entries (user_id, podcast_id, progress_seconds, played_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (user_id, podcast_id)
        DO UPDATE SET progress_seconds = EXCLUDED.progress_seconds, played_at = now()
        "#,
    )
    .bind(user_id)
    .bind(podcast_id)
    .bind(progress_seconds)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        r#"
        DELETE FROM history_entries
         WHERE user_id = $1
           AND id NOT IN (
               SELECT id FROM history_entries
                WHERE user_id = $1
                ORDER BY played_at DESC
                LIMIT 50
           )
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn list_history(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<HistoryRow>> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT podcast_id, progress_seconds, played_at
          FROM history_entries
         WHERE user_id = $1
         ORDER BY played_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
