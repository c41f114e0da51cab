//! HTTP rendering of [`AuthError`].

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::auth::{AuthError, FieldError};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl From<&AuthError> for ErrorBody {
    fn from(err: &AuthError) -> Self {
        let fields = match err {
            AuthError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        Self {
            code: err.code().to_string(),
            message: err.public_message(),
            fields,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {self}");
        }

        let body = Json(ErrorBody::from(&self));
        if self.is_token_rejection() {
            let challenge = HeaderValue::from_static("Bearer");
            return (status, [(WWW_AUTHENTICATE, challenge)], body).into_response();
        }
        (status, body).into_response()
    }
}
