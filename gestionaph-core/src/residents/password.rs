//! Argon2id password hashing for the built-in identity provider

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
    #[error("Password verification failed: {0}")]
    VerificationFailed(String),
}

/// Argon2id with the crate's default parameters (19 MiB, t=2, p=1)
#[derive(Default)]
pub struct PasswordHasherService {
    argon2: Argon2<'static>,
}

impl PasswordHasherService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash to a PHC string (`$argon2id$v=19$...`), salted per call
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasherService::new();
        let hash = hasher.hash_password("temporal-123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password("temporal-123", &hash).unwrap());
        assert!(!hasher.verify_password("temporal-124", &hash).unwrap());
    }

    #[test]
    fn test_salted_hashes_differ() {
        let hasher = PasswordHasherService::new();
        assert_ne!(hasher.hash_password("same").unwrap(), hasher.hash_password("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        let hasher = PasswordHasherService::new();
        assert!(matches!(
            hasher.verify_password("x", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }
}
