use data_encoding::HEXLOWER;
use ring::{
    digest, pbkdf2,
    rand::{SecureRandom, SystemRandom},
};
use std::num::NonZeroU32;

use super::AuthError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

pub fn validate_password_strength(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "must be at most {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    if password.trim().is_empty() {
        return Err(AuthError::WeakPassword("must not be blank".to_string()));
    }
    Ok(())
}

/// Hash a password as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`
pub fn hash_password(password: &str, iterations: u32) -> Result<String, AuthError> {
    if iterations == 0 {
        return Err(AuthError::Crypto("iteration count must be positive".to_string()));
    }
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| AuthError::Crypto("failed to generate salt".to_string()))?;
    Ok(hash_with_salt(password, iterations, &salt))
}

fn hash_with_salt(password: &str, iterations: u32, salt: &[u8]) -> String {
    let mut hash = [0u8; HASH_LEN];
    let rounds = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, rounds, salt, password.as_bytes(), &mut hash);
    format!(
        "{}${}${}${}",
        SCHEME,
        rounds,
        HEXLOWER.encode(salt),
        HEXLOWER.encode(&hash)
    )
}

/// Constant-time check of `password` against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME {
        return false;
    }
    let Some(rounds) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (HEXLOWER.decode(salt.as_bytes()), HEXLOWER.decode(hash.as_bytes())) else {
        return false;
    };

    pbkdf2::verify(pbkdf2::PBKDF2_HMAC_SHA256, rounds, &salt, password.as_bytes(), &hash).is_ok()
}

fn dummy_hash(password: &str, iterations: u32) -> String {
    hash_with_salt(password, iterations, &[0u8; SALT_LEN])
}

/// Burn the same PBKDF2 work as verifying a hash made with `iterations`; always false.
/// Used when the email is unknown so both login paths cost the same.
pub fn verify_dummy(password: &str, iterations: u32) -> bool {
    let _ = dummy_hash(password, iterations);
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("correct horse", 1_000).unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn dummy_work_follows_configured_rounds() {
        assert!(dummy_hash("whatever", 1_234).starts_with("pbkdf2-sha256$1234$"));
        assert!(dummy_hash("whatever", 310_000).starts_with("pbkdf2-sha256$310000$"));
        assert!(!verify_dummy("whatever", 1_000));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("same-password", 1_000).unwrap();
        let b = hash_password("same-password", 1_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hashes_never_match() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plain-text"));
        assert!(!verify_password("x", "bcrypt$10$aa$bb"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$aa$bb"));
        assert!(!verify_password("x", "pbkdf2-sha256$1000$zz$bb"));
    }

    #[test]
    fn dummy_verification_is_false() {
        assert!(!verify_dummy("not-a-real-password", 1_000));
    }

    #[test]
    fn strength_rules() {
        assert!(validate_password_strength("short").is_err());
        assert!(validate_password_strength("        ").is_err());
        assert!(validate_password_strength("long enough").is_ok());
        assert!(validate_password_strength(&"x".repeat(129)).is_err());
    }
}
