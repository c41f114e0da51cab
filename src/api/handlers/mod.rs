//! Route handlers for the newsroom admin API.

pub mod health;
pub mod login;
pub mod me;
pub mod principal;
pub mod root;
pub mod state;
pub mod users;

use crate::auth::{AuthError, FieldError};

/// Rejection for a request whose JSON body is absent or unreadable.
pub(crate) fn missing_payload() -> AuthError {
    AuthError::Validation(vec![FieldError::new("body", "Missing payload")])
}
