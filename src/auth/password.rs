use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hashed)
}

pub fn verify(plain: &str, hashed: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hashed).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_accepts_the_original_password() {
        let hashed = hash("mic-check-one-two").expect("hash");
        assert!(verify("mic-check-one-two", &hashed).expect("verify"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hashed = hash("mic-check-one-two").expect("hash");
        assert!(!verify("mic-check-1-2", &hashed).expect("verify"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify("anything", "not-a-phc-string").is_err());
    }
}
