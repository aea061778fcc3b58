//! Pluggable credential verification.
//!
//! The store treats `credential_secret` as opaque; this module decides what a
//! presented password means against a stored secret. The default verifier
//! understands Argon2id PHC strings and falls back to a literal comparison for
//! legacy plain-text records, so existing accounts keep working without a
//! migration step. Newly set passwords are always stored hashed.

use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Verifies a presented secret against a stored one.
pub trait Verifier: Send + Sync {
    fn verify(&self, presented: &str, stored: &str) -> bool;
}

/// Default verifier: Argon2 PHC strings are verified cryptographically,
/// anything else is compared literally.
#[derive(Default)]
pub struct SecretVerifier {
    argon2: Argon2<'static>,
}

impl SecretVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a new secret for storage.
    pub fn hash_secret(&self, secret: &str) -> Result<String, password_hash::Error> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Ok(self.argon2.hash_password(secret.as_bytes(), &salt)?.to_string())
    }
}

impl Verifier for SecretVerifier {
    fn verify(&self, presented: &str, stored: &str) -> bool {
        if stored.starts_with("$argon2") {
            match PasswordHash::new(stored) {
                Ok(parsed) => self
                    .argon2
                    .verify_password(presented.as_bytes(), &parsed)
                    .is_ok(),
                Err(_) => false,
            }
        } else {
            // Legacy plain-text record.
            presented == stored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_secrets_compare_literally() {
        let v = SecretVerifier::new();
        assert!(v.verify("password", "password"));
        assert!(!v.verify("Password", "password"));
        assert!(!v.verify("", "password"));
    }

    #[test]
    fn hashed_secrets_verify() {
        let v = SecretVerifier::new();
        let hash = v.hash_secret("hunter22").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(v.verify("hunter22", &hash));
        assert!(!v.verify("hunter23", &hash));
    }

    #[test]
    fn corrupt_hash_never_verifies() {
        let v = SecretVerifier::new();
        assert!(!v.verify("anything", "$argon2id$not-a-real-hash"));
    }
}
