use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
            OtpSentResponse, ProfileUploadResponse, RegisterRequest, ResetPasswordRequest,
            VerifyOtpRequest,
        },
        jwt::{AuthUser, JwtKeys},
        otp::{self, OtpPurpose},
        password,
    },
    email,
    error::AppError,
    state::AppState,
    uploads,
    users::repo::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-otp", post(verify_otp))
        .route("/login", post(login))
        .route("/change-password", post(change_password))
        .route("/forgot-password-otp", post(forgot_password_otp))
        .route("/reset-password", post(reset_password))
        .route(
            "/upload-profile",
            post(upload_profile).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<OtpSentResponse>), AppError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AppError::Validation("Password too short".into()));
    }

    let hash = password::hash(&payload.password)?;
    let code = otp::generate_code();
    let expires_at = otp::expiry_from(OffsetDateTime::now_utc());

    let (status, user) = match User::find_by_email(&state.db, &payload.email).await? {
        Some(existing) if existing.is_verified => {
            warn!(email = %payload.email, "email already registered");
            return Err(AppError::Validation("User already exists".into()));
        }
        Some(existing) => {
            // unverified retry: overwrite details and reissue the code
            let user = User::refresh_unverified(
                &state.db,
                existing.id,
                payload.username.trim(),
                &hash,
                payload.phone.as_deref(),
                &code,
                expires_at,
            )
            .await?;
            (StatusCode::OK, user)
        }
        None => {
            let user = User::create_unverified(
                &state.db,
                payload.username.trim(),
                &payload.email,
                &hash,
                payload.phone.as_deref(),
                &code,
                expires_at,
            )
            .await?;
            (StatusCode::CREATED, user)
        }
    };

    // registration dispatch failures fail the request
    email::send_verification_code(state.mailer.as_ref(), &user.email, &code)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "registration otp dispatch failed");
            AppError::Internal(e)
        })?;

    info!(user_id = %user.id, email = %user.email, "registration otp issued");
    Ok((
        status,
        Json(OtpSentResponse {
            message: "OTP sent to email".into(),
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = User::find_by_email(&state.db, payload.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    otp::check(
        user.otp_code.as_deref(),
        user.otp_purpose,
        user.otp_expires_at,
        payload.otp.trim(),
        OtpPurpose::Registration,
        OffsetDateTime::now_utc(),
    )?;

    User::mark_verified(&state.db, user.id).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, "email verified");
    Ok(Json(AuthResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid email or password".into()))?;

    if !password::verify(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AppError::Auth("Invalid email or password".into()));
    }

    if !user.is_verified {
        return Err(AppError::Auth(
            "Email not verified. Please register again to verify.".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !password::verify(&payload.current_password, &user.password_hash)? {
        return Err(AppError::Auth("Invalid current password".into()));
    }

    let hash = password::hash(&payload.new_password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(Json(
        serde_json::json!({ "message": "Password updated successfully" }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password_otp(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<OtpSentResponse>, AppError> {
    let user = User::find_by_email(&state.db, payload.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let code = otp::generate_code();
    User::set_otp(
        &state.db,
        user.id,
        &code,
        OtpPurpose::PasswordReset,
        otp::expiry_from(OffsetDateTime::now_utc()),
    )
    .await?;

    email::send_verification_code(state.mailer.as_ref(), &user.email, &code)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "reset otp dispatch failed");
            AppError::Internal(e)
        })?;

    info!(user_id = %user.id, "password reset otp issued");
    Ok(Json(OtpSentResponse {
        message: "OTP sent to email".into(),
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = User::find_by_email(&state.db, payload.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    otp::check(
        user.otp_code.as_deref(),
        user.otp_purpose,
        user.otp_expires_at,
        payload.otp.trim(),
        OtpPurpose::PasswordReset,
        OffsetDateTime::now_utc(),
    )?;

    let hash = password::hash(&payload.new_password)?;
    User::reset_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(serde_json::json!({
        "message": "Password updated successfully. Please login with your new password."
    })))
}

#[instrument(skip(state, multipart))]
pub async fn upload_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ProfileUploadResponse>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut stored: Option<String> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let original = field.file_name().unwrap_or("upload").to_string();
        if !uploads::extension_allowed(&original, uploads::IMAGE_EXTENSIONS) {
            return Err(AppError::Validation("Images only!".into()));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        stored = Some(uploads::store_profile_image(&state.config.upload_root, &original, &data).await?);
    }
    let stored = stored.ok_or_else(|| AppError::Validation("image file is required".into()))?;

    User::set_profile_picture(&state.db, user.id, &stored).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, path = %stored, "profile picture updated");
    Ok(Json(ProfileUploadResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        profile_picture: stored,
        is_verified: user.is_verified,
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("listener@example.com"));
        assert!(is_valid_email("a.b+c@studio.fm"));
    }

    #[test]
    fn email_validation_rejects_malformed_input() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("nodot@example"));
    }
}
