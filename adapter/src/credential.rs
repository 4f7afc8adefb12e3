use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use shared::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| AppError::PasswordHashError(e.to_string()))
}

/// `InvalidCredentials` on mismatch; a stored hash that cannot be parsed is an
/// internal error.
pub fn verify_password(password: &str, password_hash: &str) -> AppResult<()> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|e| AppError::PasswordHashError(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::InvalidCredentials)
}

/// Opaque session token bound to the account state at issue time plus 32
/// random bytes, keyed with the server secret.
pub fn generate_session_token(
    secret: &str,
    email: &str,
    password_hash: &str,
    issued_at: DateTime<Utc>,
) -> AppResult<String> {
    let mut nonce = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut nonce);
    derive_token(secret, email, password_hash, &nonce, issued_at)
}

fn derive_token(
    secret: &str,
    email: &str,
    password_hash: &str,
    nonce: &[u8],
    issued_at: DateTime<Utc>,
) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::ConversionEntityError(e.to_string()))?;
    mac.update(email.as_bytes());
    mac.update(b"\x1f");
    mac.update(password_hash.as_bytes());
    mac.update(b"\x1f");
    mac.update(nonce);
    mac.update(&issued_at.timestamp_micros().to_be_bytes());
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hash_is_internal_error() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AppError::PasswordHashError(_))
        ));
    }

    #[test]
    fn token_is_deterministic_for_same_inputs() {
        let now = Utc::now();
        let a = derive_token("k", "a@b.c", "h", &[1; 32], now).unwrap();
        let b = derive_token("k", "a@b.c", "h", &[1; 32], now).unwrap();
        let c = derive_token("other", "a@b.c", "h", &[1; 32], now).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 32 bytes, base64url without padding
        assert_eq!(a.len(), 43);
        assert!(!a.contains('=') && !a.contains('+') && !a.contains('/'));
    }

    #[test]
    fn generated_tokens_are_unique() {
        let now = Utc::now();
        let a = generate_session_token("k", "a@b.c", "h", now).unwrap();
        let b = generate_session_token("k", "a@b.c", "h", now).unwrap();
        assert_ne!(a, b);
    }
}
