//! Credential store: persistence for identity records.
//!
//! The auth core only needs lookups and a handful of targeted updates, so the
//! trait stays narrow. `PgCredentialStore` backs production; the in-memory
//! store backs tests and local development.

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use async_trait::async_trait;

use crate::auth::{
    error::AuthError,
    identity::{Identity, NewIdentity},
    role::Role,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connectivity problem (pool exhausted, connection refused, I/O).
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("username already exists")]
    Conflict,
    /// A stored row could not be mapped (for example an unknown role code).
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("credential store query failed: {0}")]
    Query(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => Self::ServiceUnavailable,
            StoreError::Conflict => Self::Conflict("username already exists".to_string()),
            StoreError::Corrupt(message) | StoreError::Query(message) => Self::Internal(message),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an identity by its normalized username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, StoreError>;

    /// Insert a new identity; the username must already be normalized.
    async fn insert(&self, new: NewIdentity) -> Result<Identity, StoreError>;

    /// Set or clear suspension. Returns `None` if the id is unknown.
    async fn set_suspended(&self, id: i64, suspended: bool)
    -> Result<Option<Identity>, StoreError>;

    /// Returns `None` if the id is unknown.
    async fn set_role(&self, id: i64, role: Role) -> Result<Option<Identity>, StoreError>;

    /// All identities ordered by id.
    async fn list(&self) -> Result<Vec<Identity>, StoreError>;

    /// Connectivity check for `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}
