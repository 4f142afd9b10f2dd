use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error taxonomy. Every variant maps to a stable `kind` string
/// in the response body so clients can branch without parsing message text.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// Missing, invalid or expired bearer credentials.
    #[error("{0}")]
    Auth(String),
    /// Supplied one-time code does not match the pending one (or none is
    /// pending for the requested flow).
    #[error("Invalid OTP")]
    InvalidOtp,
    /// Supplied code matched but its window has passed.
    #[error("OTP expired")]
    ExpiredOtp,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Auth(_) => "auth",
            AppError::InvalidOtp => "invalid_otp",
            AppError::ExpiredOtp => "expired_otp",
            AppError::Conflict(_) => "conflict",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidOtp | AppError::ExpiredOtp => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "message": message, "kind": self.kind() }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidOtp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ExpiredOtp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_and_expired_codes_stay_distinguishable() {
        assert_ne!(AppError::InvalidOtp.kind(), AppError::ExpiredOtp.kind());
        assert_ne!(
            AppError::InvalidOtp.to_string(),
            AppError::ExpiredOtp.to_string()
        );
    }
}
