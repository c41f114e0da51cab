//! Stored account records.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use super::role::Role;

/// A registered account as held by the credential store.
///
/// The password digest is wrapped in `SecretString` so it never shows up in
/// `Debug` output or logs. Suspension is modelled only by `suspended_at`;
/// the flag is derived, so the two can never disagree.
#[derive(Clone, Debug)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_digest: SecretString,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub suspended_at: Option<DateTime<Utc>>,
}

impl Identity {
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }
}

/// Fields required to insert a new account. The digest must already be hashed.
#[derive(Clone, Debug)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_digest: SecretString,
    pub role: Role,
}

/// Normalize a username for lookup/uniqueness checks.
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Normalize an email before persisting it.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
