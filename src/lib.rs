//! # Newsdesk (identity and access core)
//!
//! `newsdesk` authenticates staff of a news-publishing admin backend and gates
//! the admin API by role.
//!
//! ## Authentication
//!
//! Passwords are stored as Argon2id PHC digests. A successful login returns a
//! short-lived HS256 bearer token carrying the user id, username, email and
//! role. Tokens are verified offline against a process-wide signing secret;
//! there is no revocation list.
//!
//! ## Staleness
//!
//! A token freezes the role and suspension state at issuance. Suspending a
//! user blocks new logins immediately, while tokens already issued stay valid
//! until they expire (15 minutes by default). User administration endpoints
//! re-fetch the caller from the credential store, so a suspended or demoted
//! admin loses access to them at once.
//!
//! ## Roles
//!
//! `admin`, `editor`, `reporter` and `reader`. Unknown role codes are rejected
//! wherever they appear (tokens, stored rows, requests).

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
