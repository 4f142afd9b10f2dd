use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::{email, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(send_message))
}

#[instrument(skip(state, payload))]
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.subject.trim().is_empty()
        || payload.message.trim().is_empty()
    {
        return Err(AppError::Validation("All fields are required".into()));
    }

    // contact relay failures fail the request
    email::send_contact_message(
        state.mailer.as_ref(),
        &state.config.smtp.admin_email,
        payload.name.trim(),
        payload.email.trim(),
        payload.subject.trim(),
        &payload.message,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "contact dispatch failed");
        AppError::Internal(e)
    })?;

    info!(from = %payload.email, "contact message relayed");
    Ok(Json(json!({ "message": "Message sent successfully" })))
}
