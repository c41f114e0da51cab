//! User administration endpoints (Admin only).
//!
//! Flow Overview:
//! 1) Verify the bearer token and its embedded role.
//! 2) Re-fetch the caller so a suspension or demotion after issuance takes
//!    effect immediately on these endpoints.
//! 3) Apply the change through the auth service.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::{
    missing_payload,
    principal::{Principal, require_auth},
    state::AuthState,
};
use crate::api::error::ErrorBody;
use crate::auth::{AuthError, Identity, NewUser, Role};

/// Identity without its password digest.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub suspended: bool,
    pub suspended_at: Option<DateTime<Utc>>,
}

impl From<Identity> for UserSummary {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            email: identity.email,
            role: identity.role,
            created_at: identity.created_at,
            suspended: identity.suspended_at.is_some(),
            suspended_at: identity.suspended_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// One of `admin`, `editor`, `reporter`, `reader`.
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRoleRequest {
    pub role: String,
}

async fn require_admin(headers: &HeaderMap, auth_state: &AuthState) -> Result<Principal, AuthError> {
    let principal = require_auth(headers, auth_state.verifier())?;
    principal.require_role(&[Role::Admin])?;
    let current = principal.require_active(auth_state.service()).await?;
    if current.role != Role::Admin {
        return Err(AuthError::Forbidden);
    }
    Ok(principal)
}

#[utoipa::path(
    get,
    path = "/v1/users",
    responses(
        (status = 200, description = "All users ordered by id", body = [UserSummary]),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not an active admin", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn list_users(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<Vec<UserSummary>>, AuthError> {
    require_admin(&headers, &auth_state).await?;
    let users = auth_state.service().list_users().await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not an active admin", body = ErrorBody),
        (status = 409, description = "Username already exists", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn create_user(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<UserSummary>), AuthError> {
    require_admin(&headers, &auth_state).await?;
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let identity = auth_state
        .service()
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            password: SecretString::from(request.password),
            role: request.role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(UserSummary::from(identity))))
}

#[utoipa::path(
    post,
    path = "/v1/users/{id}/suspend",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User suspended", body = UserSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not an active admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 409, description = "Admins cannot suspend themselves", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(headers, auth_state))]
pub async fn suspend_user(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserSummary>, AuthError> {
    let principal = require_admin(&headers, &auth_state).await?;
    let identity = auth_state.service().suspend(principal.user_id, id).await?;
    Ok(Json(UserSummary::from(identity)))
}

#[utoipa::path(
    post,
    path = "/v1/users/{id}/unsuspend",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Suspension cleared", body = UserSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not an active admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(headers, auth_state))]
pub async fn unsuspend_user(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserSummary>, AuthError> {
    require_admin(&headers, &auth_state).await?;
    let identity = auth_state.service().unsuspend(id).await?;
    Ok(Json(UserSummary::from(identity)))
}

#[utoipa::path(
    put,
    path = "/v1/users/{id}/role",
    params(("id" = i64, Path, description = "User id")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserSummary),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not an active admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 409, description = "Admins cannot change their own role", body = ErrorBody),
        (status = 422, description = "Unknown role code", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(headers, auth_state, payload))]
pub async fn change_role(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<i64>,
    payload: Option<Json<ChangeRoleRequest>>,
) -> Result<Json<UserSummary>, AuthError> {
    let principal = require_admin(&headers, &auth_state).await?;
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };
    let identity = auth_state
        .service()
        .change_role(principal.user_id, id, &request.role)
        .await?;
    Ok(Json(UserSummary::from(identity)))
}
