use crate::{
    api::{self, BootstrapAdmin},
    auth::{AuthConfig, SigningSecret},
    cli::telemetry,
};
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub signing_secret: SigningSecret,
    pub token_issuer: String,
    pub token_audience: String,
    pub token_ttl_seconds: i64,
    pub login_rate_per_minute: u32,
    pub login_rate_burst: u32,
    pub trust_proxy_headers: bool,
    pub frontend_base_url: String,
    pub bootstrap: Option<BootstrapAdmin>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the bootstrap admin
/// cannot be created, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_token_issuer(args.token_issuer)
        .with_token_audience(args.token_audience)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_login_rate(args.login_rate_per_minute, args.login_rate_burst)
        .with_trust_proxy_headers(args.trust_proxy_headers);

    debug!("Auth config: {:?}", auth_config);

    let result = api::new(
        args.port,
        args.dsn,
        auth_config,
        args.signing_secret,
        args.bootstrap,
    )
    .await;

    telemetry::shutdown_tracer();
    result
}
