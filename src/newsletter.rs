//! Newsletter signups, separate from channel subscriptions: a plain email
//! list with a fire-and-forget welcome message.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{auth::handlers::is_valid_email, email, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscriber {
    pub id: Uuid,
    pub email: String,
    pub created_at: OffsetDateTime,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/subscribe", post(subscribe))
}

#[instrument(skip(state, payload))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(mut payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() {
        return Err(AppError::Validation("Email is required".into()));
    }
    if !is_valid_email(&payload.email) {
        return Err(AppError::Validation("Invalid email".into()));
    }

    let existing: Option<NewsletterSubscriber> = sqlx::query_as(
        r#"SELECT id, email, created_at FROM newsletter_subscribers WHERE email = $1"#,
    )
    .bind(&payload.email)
    .fetch_optional(&state.db)
    .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("You have already subscribed before".into()));
    }

    let subscriber: NewsletterSubscriber = sqlx::query_as(
        r#"
        INSERT INTO newsletter_subscribers (email)
        VALUES ($1)
        RETURNING id, email, created_at
        "#,
    )
    .bind(&payload.email)
    .fetch_one(&state.db)
    .await?;

    // welcome email never blocks the signup
    let mailer = state.mailer.clone();
    let to = subscriber.email.clone();
    tokio::spawn(async move {
        email::send_newsletter_welcome(mailer.as_ref(), &to).await;
    });

    info!(email = %subscriber.email, "newsletter signup");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Subscribed successfully", "data": subscriber })),
    ))
}
