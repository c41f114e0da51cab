//! Identity and access core.
//!
//! Login flow: normalise the username, look up the identity, reject suspended
//! accounts, verify the Argon2 digest on the blocking pool, then sign a
//! short-lived HS256 token. Verification of that token is pure CPU and never
//! touches the credential store.

pub mod config;
pub mod error;
pub mod identity;
pub mod password;
pub mod rate_limit;
pub mod role;
pub mod service;
pub mod token;
pub mod validation;

pub use config::{AuthConfig, SigningSecret};
pub use error::AuthError;
pub use identity::{Identity, NewIdentity};
pub use password::PasswordHasher;
pub use rate_limit::{KeyedRateLimiter, NoopRateLimiter, RateLimiter};
pub use role::Role;
pub use service::{AuthService, LoginSuccess, NewUser};
pub use token::{IssuedToken, TokenIssuer, TokenVerifier, VerifiedToken};
pub use validation::FieldError;
