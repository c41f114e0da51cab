//! Authentication and authorization outcomes.
//!
//! Every variant is a terminal, user-visible result; nothing here is retried
//! by the core. `InvalidCredentials` deliberately covers both "unknown user"
//! and "wrong password".

use thiserror::Error;

use super::validation::FieldError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account suspended")]
    AccountSuspended,

    #[error("missing bearer token")]
    MissingToken,

    #[error("malformed token")]
    MalformedToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    /// Correctly signed, but minted for a different issuer or audience.
    #[error("token not issued for this service")]
    ForeignToken,

    #[error("too many requests")]
    TooManyRequests,

    /// Stored digest could not be parsed: operator/data error.
    #[error("stored credential is unreadable")]
    CorruptCredential,

    #[error("insufficient role")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// The credential store could not be reached.
    #[error("service unavailable")]
    ServiceUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status code for this outcome.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials
            | Self::MissingToken
            | Self::MalformedToken
            | Self::InvalidSignature
            | Self::Expired
            | Self::ForeignToken => 401,
            Self::AccountSuspended | Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict(_) => 409,
            Self::Validation(_) => 422,
            Self::TooManyRequests => 429,
            Self::CorruptCredential | Self::Internal(_) => 500,
            Self::ServiceUnavailable => 503,
        }
    }

    /// Stable machine-readable code for API responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountSuspended => "ACCOUNT_SUSPENDED",
            Self::MissingToken => "MISSING_TOKEN",
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "TOKEN_EXPIRED",
            Self::ForeignToken => "FOREIGN_TOKEN",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::CorruptCredential => "CORRUPT_CREDENTIAL",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to clients. Internal details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::CorruptCredential | Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// True for rejections produced while checking a bearer token.
    #[must_use]
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingToken
                | Self::MalformedToken
                | Self::InvalidSignature
                | Self::Expired
                | Self::ForeignToken
        )
    }
}
