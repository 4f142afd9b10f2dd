//! One-time codes guarding sensitive flows. A code is bound to the purpose
//! it was issued for, so a pending password-reset code can not be replayed
//! against an account deletion.

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::AppError;

/// Flow a pending code is allowed to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "otp_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    PasswordReset,
    Deletion,
}

/// Codes stay valid for ten minutes from issuance.
pub const OTP_TTL: Duration = Duration::minutes(10);

/// Six decimal digits drawn from the OS entropy source.
pub fn generate_code() -> String {
    rand::rngs::OsRng.gen_range(100_000..=999_999).to_string()
}

pub fn expiry_from(now: OffsetDateTime) -> OffsetDateTime {
    now + OTP_TTL
}

/// Check a supplied code against the pending one on a user row.
///
/// A wrong or missing code, and a code issued for a different purpose,
/// report `InvalidOtp`; a matching code past its window reports
/// `ExpiredOtp`. The caller clears the stored fields on success.
pub fn check(
    stored_code: Option<&str>,
    stored_purpose: Option<OtpPurpose>,
    expires_at: Option<OffsetDateTime>,
    supplied: &str,
    purpose: OtpPurpose,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    let (code, stored_purpose, expires_at) = match (stored_code, stored_purpose, expires_at) {
        (Some(c), Some(p), Some(e)) => (c, p, e),
        _ => return Err(AppError::InvalidOtp),
    };
    if stored_purpose != purpose || code != supplied {
        return Err(AppError::InvalidOtp);
    }
    if now > expires_at {
        return Err(AppError::ExpiredOtp);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn pending(code: &str, purpose: OtpPurpose) -> (Option<String>, Option<OtpPurpose>, Option<OffsetDateTime>) {
        (Some(code.to_string()), Some(purpose), Some(expiry_from(now())))
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn matching_code_within_window_passes() {
        let (code, purpose, exp) = pending("482913", OtpPurpose::Deletion);
        assert!(check(
            code.as_deref(),
            purpose,
            exp,
            "482913",
            OtpPurpose::Deletion,
            now()
        )
        .is_ok());
    }

    #[test]
    fn wrong_code_is_invalid_even_when_unexpired() {
        let (code, purpose, exp) = pending("482913", OtpPurpose::Deletion);
        let err = check(
            code.as_deref(),
            purpose,
            exp,
            "000000",
            OtpPurpose::Deletion,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }

    #[test]
    fn stale_code_reports_expired() {
        let (code, purpose, exp) = pending("482913", OtpPurpose::Registration);
        let err = check(
            code.as_deref(),
            purpose,
            exp,
            "482913",
            OtpPurpose::Registration,
            now() + Duration::minutes(11),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ExpiredOtp));
    }

    #[test]
    fn purpose_mismatch_never_verifies() {
        let (code, purpose, exp) = pending("482913", OtpPurpose::PasswordReset);
        let err = check(
            code.as_deref(),
            purpose,
            exp,
            "482913",
            OtpPurpose::Deletion,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }

    #[test]
    fn absent_code_is_invalid() {
        let err = check(None, None, None, "482913", OtpPurpose::Deletion, now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }
}
