//! Argon2id credential hashing and the password policy that gates it.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password must contain at least 8 characters")]
    TooShort,
    #[error("hash password: {0}")]
    Hash(password_hash::Error),
    #[error("parse stored password hash: {0}")]
    MalformedHash(password_hash::Error),
}

/// Length is counted in characters, not bytes.
pub fn check_policy(plain: &str) -> Result<(), PasswordError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    Ok(())
}

/// PHC string for a new credential, salted from the OS RNG.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    check_policy(plain)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored).map_err(PasswordError::MalformedHash)?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_is_argon2id_phc_and_verifies() {
        let hash = hash_password("Secur3P@ssw0rd!").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Secur3P@ssw0rd!"));
        assert!(verify_password("Secur3P@ssw0rd!", &hash).expect("verify"));
        assert!(!verify_password("wrong-password", &hash).expect("verify"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("hunter2hunter2").unwrap();
        let b = hash_password("hunter2hunter2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn short_passwords_are_refused_before_hashing() {
        assert!(matches!(hash_password("1234567"), Err(PasswordError::TooShort)));
        assert!(check_policy("12345678").is_ok());
        // Seven two-byte characters are 14 bytes but still too short.
        assert!(check_policy("ñññññññ").is_err());
        assert!(check_policy("ññññññññ").is_ok());
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, PasswordError::MalformedHash(_)));
    }
}
