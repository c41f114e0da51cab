//! Argon2id password hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...$salt$hash`), so the
//! algorithm parameters and salt travel with the digest and verification does
//! not need any out-of-band configuration.

use argon2::{
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _, password_hash::SaltString,
};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use std::sync::OnceLock;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// The stored digest is not a parseable PHC string.
    #[error("corrupt credential digest")]
    CorruptCredential,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[derive(Clone, Debug, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    /// Returns `PasswordError::Hash` if Argon2 rejects its inputs.
    pub fn hash(&self, plaintext: &str) -> Result<SecretString, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| PasswordError::Hash(err.to_string()))?;
        Ok(SecretString::from(digest.to_string()))
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A mismatch is `Ok(false)`.
    ///
    /// # Errors
    /// Returns `PasswordError::CorruptCredential` if the digest cannot be parsed
    /// or names parameters Argon2 cannot use.
    pub fn verify(&self, plaintext: &str, digest: &SecretString) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(digest.expose_secret()).map_err(|err| {
            error!("Stored password digest is unreadable: {err}");
            PasswordError::CorruptCredential
        })?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => {
                error!("Stored password digest failed verification setup: {err}");
                Err(PasswordError::CorruptCredential)
            }
        }
    }

    /// Burn the same amount of work as a real verification. Used when the
    /// username does not exist so response timing does not reveal it.
    pub fn verify_dummy(&self, plaintext: &str) {
        let Some(digest) = dummy_digest(self) else {
            return;
        };
        let _ = self.verify(plaintext, digest);
    }
}

fn dummy_digest(hasher: &PasswordHasher) -> Option<&'static SecretString> {
    static DUMMY: OnceLock<Option<SecretString>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hasher.hash("newsdesk-dummy-password").ok())
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hash_then_verify_round_trips() -> Result<(), PasswordError> {
        let hasher = PasswordHasher::new();
        let digest = hasher.hash("Secret123")?;
        assert!(hasher.verify("Secret123", &digest)?);
        Ok(())
    }

    #[test]
    fn wrong_password_is_false_not_error() -> Result<(), PasswordError> {
        let hasher = PasswordHasher::new();
        let digest = hasher.hash("Secret123")?;
        assert!(!hasher.verify("Secret124", &digest)?);
        assert!(!hasher.verify("", &digest)?);
        Ok(())
    }

    #[test]
    fn digests_are_salted_and_self_describing() -> Result<(), PasswordError> {
        let hasher = PasswordHasher::new();
        let first = hasher.hash("Secret123")?;
        let second = hasher.hash("Secret123")?;
        assert_ne!(first.expose_secret(), second.expose_secret());
        assert!(first.expose_secret().starts_with("$argon2id$"));
        assert!(hasher.verify("Secret123", &second)?);
        Ok(())
    }

    #[test]
    fn malformed_digest_is_corrupt_credential() {
        let hasher = PasswordHasher::new();
        let digest = SecretString::from("not-a-phc-string".to_string());
        assert!(matches!(
            hasher.verify("Secret123", &digest),
            Err(PasswordError::CorruptCredential)
        ));
    }

    #[test]
    fn dummy_verification_does_not_panic() {
        PasswordHasher::new().verify_dummy("whatever");
    }

    proptest! {
        // Each case costs a full Argon2 hash.
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn hashed_password_verifies(password in "\\PC{1,40}") {
            let hasher = PasswordHasher::new();
            let digest = hasher.hash(&password).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(hasher.verify(&password, &digest).map_err(|e| TestCaseError::fail(e.to_string()))?);
        }

        #[test]
        fn other_password_never_verifies(stored in "\\PC{1,40}", attempt in "\\PC{0,40}") {
            prop_assume!(stored != attempt);
            let hasher = PasswordHasher::new();
            let digest = hasher.hash(&stored).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert!(!hasher.verify(&attempt, &digest).map_err(|e| TestCaseError::fail(e.to_string()))?);
        }
    }
}
