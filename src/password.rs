//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored as `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::auth::AuthError;

const SCHEME: &str = "pbkdf2-sha256";
const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = derive_key(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        B64.encode(salt),
        B64.encode(key)
    )
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AuthError::MalformedHash);
    };
    if scheme != SCHEME {
        return Err(AuthError::MalformedHash);
    }
    let iterations: u32 = iterations.parse().map_err(|_| AuthError::MalformedHash)?;
    let salt = B64.decode(salt).map_err(|_| AuthError::MalformedHash)?;
    let expected = B64.decode(hash).map_err(|_| AuthError::MalformedHash)?;

    let key = derive_key(password, &salt, iterations.max(1));
    Ok(constant_time_eq(&key, &expected))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("s3cret", 10);
        assert!(stored.starts_with("pbkdf2-sha256$10$"));
        assert!(verify_password("s3cret", &stored).expect("verify"));
        assert!(!verify_password("s3cret ", &stored).expect("verify"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same", 10), hash_password("same", 10));
    }

    #[test]
    fn salt_is_full_width() {
        let stored = hash_password("pw", 10);
        let salt = stored.split('$').nth(2).expect("salt field");
        assert_eq!(B64.decode(salt).expect("base64").len(), SALT_LEN);
    }

    #[test]
    fn plaintext_is_not_a_hash() {
        assert!(matches!(
            verify_password("admin", "admin"),
            Err(AuthError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("x", "md5$1$AAAA$AAAA"),
            Err(AuthError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("x", "pbkdf2-sha256$ten$AAAA$AAAA"),
            Err(AuthError::MalformedHash)
        ));
    }

    #[test]
    fn zero_iterations_are_clamped() {
        let stored = hash_password("pw", 0);
        assert!(stored.starts_with("pbkdf2-sha256$1$"));
        assert!(verify_password("pw", &stored).expect("verify"));
    }
}
