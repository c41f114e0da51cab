use axum::response::IntoResponse;

use crate::GIT_COMMIT_HASH;

// Undocumented banner so a bare GET on the host identifies the build.
pub async fn root() -> impl IntoResponse {
    format!(
        "{} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        GIT_COMMIT_HASH
    )
}
