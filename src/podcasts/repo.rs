use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "media_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Podcast {
    pub id: Uuid,
    /// Loose catalog id ("1", "20") kept for entries that predate real rows.
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
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Episode {
    pub id: Uuid,
    pub podcast_id: Uuid,
    pub legacy_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub published: Option<String>,
    pub episode_number: Option<i32>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
}

/// Podcast row joined with its owner's public fields for list endpoints.
#[derive(Debug, Clone, FromRow)]
pub struct PodcastWithOwner {
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
    pub updated_at: OffsetDateTime,
    pub owner_username: Option<String>,
    pub owner_profile_picture: Option<String>,
}

pub struct NewPodcast<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub language: Option<&'a str>,
    pub media_type: MediaType,
    pub user_id: Uuid,
    pub author: &'a str,
    pub image: Option<&'a str>,
    pub audio_url: Option<&'a str>,
    pub video_url: Option<&'a str>,
}

impl Podcast {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Podcast>> {
        let podcast = sqlx::query_as::<_, Podcast>(
            r#"
            SELECT id, legacy_id, title, author, user_id, description, image, category,
                   language, media_type, audio_url, video_url, views, rating, created_at, updated_at
            FROM podcasts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(podcast)
    }

    pub async fn find_by_legacy_id(db: &PgPool, legacy_id: &str) -> anyhow::Result<Option<Podcast>> {
        let podcast = sqlx::query_as::<_, Podcast>(
            r#"
            SELECT id, legacy_id, title, author, user_id, description, image, category,
                   language, media_type, audio_url, video_url, views, rating, created_at, updated_at
            FROM podcasts
            WHERE legacy_id = $1
            "#,
        )
        .bind(legacy_id)
        .fetch_optional(db)
        .await?;
        Ok(podcast)
    }

    /// Resolve a path parameter that may be a loose catalog id or a row id.
    /// Legacy ids win; a ref that parses as a UUID falls back to the key.
    pub async fn find_by_ref(db: &PgPool, podcast_ref: &str) -> anyhow::Result<Option<Podcast>> {
        if let Some(podcast) = Self::find_by_legacy_id(db, podcast_ref).await? {
            return Ok(Some(podcast));
        }
        if let Ok(id) = Uuid::parse_str(podcast_ref) {
            return Self::find_by_id(db, id).await;
        }
        Ok(None)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<PodcastWithOwner>> {
        let rows = sqlx::query_as::<_, PodcastWithOwner>(
            r#"
            SELECT p.id, p.legacy_id, p.title, p.author, p.user_id, p.description, p.image,
                   p.category, p.language, p.media_type, p.audio_url, p.video_url, p.views,
                   p.rating, p.created_at, p.updated_at,
                   u.username AS owner_username, u.profile_picture AS owner_profile_picture
            FROM podcasts p
            LEFT JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Podcast>> {
        let rows = sqlx::query_as::<_, Podcast>(
            r#"
            SELECT id, legacy_id, title, author, user_id, description, image, category,
                   language, media_type, audio_url, video_url, views, rating, created_at, updated_at
            FROM podcasts
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Podcasts the user has liked, most recent reaction first.
    pub async fn list_liked_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Podcast>> {
        let rows = sqlx::query_as::<_, Podcast>(
            r#"
            SELECT p.id, p.legacy_id, p.title, p.author, p.user_id, p.description, p.image,
                   p.category, p.language, p.media_type, p.audio_url, p.video_url, p.views,
                   p.rating, p.created_at, p.updated_at
            FROM podcasts p
            JOIN podcast_likes l ON l.podcast_id = p.id
            WHERE l.user_id = $1
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Podcast>> {
        let rows = sqlx::query_as::<_, Podcast>(
            r#"
            SELECT id, legacy_id, title, author, user_id, description, image, category,
                   language, media_type, audio_url, video_url, views, rating, created_at, updated_at
            FROM podcasts
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Insert the podcast and a first episode mirroring its root media.
    pub async fn create_with_first_episode(
        db: &PgPool,
        new: NewPodcast<'_>,
    ) -> anyhow::Result<(Podcast, Episode)> {
        let mut tx: Transaction<'_, Postgres> = db.begin().await?;
        let podcast = sqlx::query_as::<_, Podcast>(
            r#"
            INSERT INTO podcasts (title, description, category, language, media_type,
                                  user_id, author, image, audio_url, video_url, rating)
            VALUES ($1, $2, $3, COALESCE($4, 'Hindi'), $5, $6, $7, $8, $9, $10, 0)
            RETURNING id, legacy_id, title, author, user_id, description, image, category,
                      language, media_type, audio_url, video_url, views, rating, created_at, updated_at
            "#,
        )
        .bind(new.title)
        .bind(new.description)
        .bind(new.category)
        .bind(new.language)
        .bind(new.media_type)
        .bind(new.user_id)
        .bind(new.author)
        .bind(new.image)
        .bind(new.audio_url)
        .bind(new.video_url)
        .fetch_one(&mut *tx)
        .await?;

        let episode = sqlx::query_as::<_, Episode>(
            r#"
            INSERT INTO episodes (podcast_id, title, description, episode_number, audio_url, video_url)
            VALUES ($1, $2, $3, 1, $4, $5)
            RETURNING id, podcast_id, legacy_id, title, description, duration, published,
                      episode_number, audio_url, video_url
            "#,
        )
        .bind(podcast.id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.audio_url)
        .bind(new.video_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((podcast, episode))
    }

    /// Update editable fields; absent values keep the prior ones.
    pub async fn update_details(
        db: &PgPool,
        id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        category: Option<&str>,
        language: Option<&str>,
    ) -> anyhow::Result<Podcast> {
        let podcast = sqlx::query_as::<_, Podcast>(
            r#"
            UPDATE podcasts
               SET title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   category = COALESCE($4, category),
                   language = COALESCE($5, language),
                   updated_at = now()
             WHERE id = $1
            RETURNING id, legacy_id, title, author, user_id, description, image, category,
                      language, media_type, audio_url, video_url, views, rating, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(language)
        .fetch_one(db)
        .await?;
        Ok(podcast)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM podcasts WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Atomic view bump; returns the new count.
    pub async fn increment_views(db: &PgPool, id: Uuid) -> anyhow::Result<i64> {
        let views: i64 =
            sqlx::query_scalar(r#"UPDATE podcasts SET views = views + 1 WHERE id = $1 RETURNING views"#)
                .bind(id)
                .fetch_one(db)
                .await?;
        Ok(views)
    }

    pub async fn like_count(db: &PgPool, id: Uuid) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM podcast_likes WHERE podcast_id = $1"#)
                .bind(id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn dislike_count(db: &PgPool, id: Uuid) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM podcast_dislikes WHERE podcast_id = $1"#)
                .bind(id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }
}

impl Episode {
    pub async fn list_by_podcast(db: &PgPool, podcast_id: Uuid) -> anyhow::Result<Vec<Episode>> {
        let rows = sqlx::query_as::<_, Episode>(
            r#"
            SELECT id, podcast_id, legacy_id, title, description, duration, published,
                   episode_number, audio_url, video_url
            FROM episodes
            WHERE podcast_id = $1
            ORDER BY episode_number ASC NULLS LAST
            "#,
        )
        .bind(podcast_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Every episode belonging to any podcast the user owns.
    pub async fn list_by_owner(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Episode>> {
        let rows = sqlx::query_as::<_, Episode>(
            r#"
            SELECT e.id, e.podcast_id, e.legacy_id, e.title, e.description, e.duration,
                   e.published, e.episode_number, e.audio_url, e.video_url
            FROM episodes e
            JOIN podcasts p ON p.id = e.podcast_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
