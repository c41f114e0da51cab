use axum::{Json, extract::Extension, http::HeaderMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{
    principal::{Principal, require_auth},
    state::AuthState,
};
use crate::api::error::ErrorBody;
use crate::auth::{AuthError, Role};

/// The caller as seen by the token; no store lookup.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl From<Principal> for MeResponse {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.user_id,
            username: principal.username,
            email: principal.email,
            role: principal.role,
            issued_at: principal.issued_at,
            expires_at: principal.expires_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Claims of the bearer token", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn get_me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<MeResponse>, AuthError> {
    let principal = require_auth(&headers, auth_state.verifier())?;
    Ok(Json(MeResponse::from(principal)))
}
