//! Password hashing with Argon2id
//!
//! Hashes are PHC strings with a random salt. When a pepper is configured it
//! is prepended to the password on both hash and verify, so changing the
//! pepper invalidates every stored hash.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

use crate::domain::result::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct PasswordService {
    pepper: Option<String>,
}

impl PasswordService {
    pub fn new(pepper: Option<String>) -> Self {
        Self {
            pepper: pepper.filter(|p| !p.is_empty()),
        }
    }

    fn peppered(&self, password: &str) -> String {
        match &self.pepper {
            Some(p) => format!("{p}{password}"),
            None => password.to_string(),
        }
    }

    /// Hash a password into a PHC string
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(self.peppered(password).as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Other(format!("Failed to hash password: {e}")))
    }

    /// Constant-time check of a password against a stored hash
    ///
    /// A malformed stored hash is an error, not a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::Other(format!("Invalid password hash: {e}")))?;

        match Argon2::default().verify_password(self.peppered(password).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Other(format!("Password verification failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_phc() {
        let service = PasswordService::default();
        let a = service.hash("secret1").unwrap();
        let b = service.hash("secret1").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(!a.contains("secret1"));
    }

    #[test]
    fn test_verify() {
        let service = PasswordService::default();
        let hash = service.hash("secret1").unwrap();
        assert!(service.verify("secret1", &hash).unwrap());
        assert!(!service.verify("secret2", &hash).unwrap());
    }

    #[test]
    fn test_pepper_must_match() {
        let peppered = PasswordService::new(Some("pepper!".to_string()));
        let hash = peppered.hash("secret1").unwrap();
        assert!(peppered.verify("secret1", &hash).unwrap());
        assert!(!PasswordService::default().verify("secret1", &hash).unwrap());
    }

    #[test]
    fn test_empty_pepper_is_ignored() {
        let hash = PasswordService::new(Some(String::new())).hash("secret1").unwrap();
        assert!(PasswordService::default().verify("secret1", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert!(PasswordService::default().verify("pw", "plain-text").is_err());
    }
}
