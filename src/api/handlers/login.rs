//! Password login.

use axum::{
    Json,
    extract::{ConnectInfo, Extension},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tracing::instrument;
use utoipa::ToSchema;

use super::{missing_payload, principal::client_ip, state::AuthState};
use crate::api::error::ErrorBody;
use crate::auth::{
    AuthError, Role,
    identity::normalize_username,
    rate_limit::{RateLimitAction, RateLimitDecision},
};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; bearer token issued", body = LoginResponse),
        (status = 401, description = "Unknown user or wrong password", body = ErrorBody),
        (status = 403, description = "Account suspended", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
        (status = 429, description = "Rate limited", body = ErrorBody),
        (status = 503, description = "Credential store unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };

    // Rate-limit before the service runs so abuse never reaches the store.
    let ip_key = client_ip(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        auth_state.config().trust_proxy_headers(),
    )
    .map(|ip| ip.to_string());
    if auth_state
        .rate_limiter()
        .check_ip(ip_key.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return Err(AuthError::TooManyRequests);
    }
    let username = normalize_username(&request.username);
    if !username.is_empty()
        && auth_state
            .rate_limiter()
            .check_username(&username, RateLimitAction::Login)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::TooManyRequests);
    }

    let success = auth_state
        .service()
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        id: success.id,
        username: success.username,
        email: success.email,
        role: success.role,
        token: success.token,
        expires_at: success.expires_at,
    }))
}
