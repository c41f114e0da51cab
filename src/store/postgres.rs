//! `PostgreSQL` credential store.
//!
//! Schema lives in `sql/schema.sql`. The table keeps both `suspended` and
//! `suspended_at` for reporting; a CHECK constraint keeps them in step and
//! every write here sets both in one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{Instrument, error};

use super::{CredentialStore, StoreError};
use crate::auth::{
    identity::{Identity, NewIdentity},
    role::Role,
};

const SELECT_COLUMNS: &str =
    "id, username, email, password_digest, role, created_at, suspended_at";

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            error!("Credential store unreachable: {err}");
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Database(ref db_err) if db_err.code().is_some_and(|c| c == "23505") => {
            StoreError::Conflict
        }
        other => {
            error!("Credential store query failed: {other}");
            StoreError::Query(other.to_string())
        }
    }
}

fn identity_from_row(row: &PgRow) -> Result<Identity, StoreError> {
    let role_code: String = row.get("role");
    let role = Role::from_code(&role_code).map_err(|err| StoreError::Corrupt(err.to_string()))?;
    let digest: String = row.get("password_digest");
    let suspended_at: Option<DateTime<Utc>> = row.get("suspended_at");

    Ok(Identity {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_digest: SecretString::from(digest),
        role,
        created_at: row.get("created_at"),
        suspended_at,
    })
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn insert(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        let query = format!(
            "INSERT INTO users (username, email, password_digest, role) VALUES ($1, $2, $3, $4) RETURNING {SELECT_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(&new.username)
            .bind(&new.email)
            .bind(new.password_digest.expose_secret())
            .bind(new.role.code())
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await
            .map_err(map_sqlx_error)?;

        identity_from_row(&row)
    }

    async fn set_suspended(
        &self,
        id: i64,
        suspended: bool,
    ) -> Result<Option<Identity>, StoreError> {
        // COALESCE keeps the original timestamp when re-suspending.
        let query = format!(
            r"
            UPDATE users
            SET suspended = $2,
                suspended_at = CASE WHEN $2 THEN COALESCE(suspended_at, NOW()) ELSE NULL END
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(suspended)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<Option<Identity>, StoreError> {
        let query = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {SELECT_COLUMNS}");
        let row = sqlx::query(&query)
            .bind(id)
            .bind(role.code())
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Identity>, StoreError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(identity_from_row).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(span)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}
