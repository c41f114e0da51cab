use anyhow::{Result, anyhow, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::BootstrapAdmin;
use crate::auth::config::{
    DEFAULT_LOGIN_RATE_BURST, DEFAULT_LOGIN_RATE_PER_MINUTE, DEFAULT_TOKEN_AUDIENCE,
    DEFAULT_TOKEN_ISSUER, DEFAULT_TOKEN_TTL_SECONDS,
};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_ISSUER: &str = "token-issuer";
pub const ARG_TOKEN_AUDIENCE: &str = "token-audience";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_LOGIN_RATE_PER_MINUTE: &str = "login-rate-per-minute";
pub const ARG_LOGIN_RATE_BURST: &str = "login-rate-burst";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_TRUST_PROXY_HEADERS: &str = "trust-proxy-headers";
pub const ARG_BOOTSTRAP_ADMIN_USERNAME: &str = "bootstrap-admin-username";
pub const ARG_BOOTSTRAP_ADMIN_EMAIL: &str = "bootstrap-admin-email";
pub const ARG_BOOTSTRAP_ADMIN_PASSWORD: &str = "bootstrap-admin-password";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_login_args(command);
    with_bootstrap_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HMAC secret used to sign bearer tokens (at least 32 bytes)")
                .env("NEWSDESK_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_ISSUER)
                .long(ARG_TOKEN_ISSUER)
                .help("Issuer embedded in and required from bearer tokens")
                .env("NEWSDESK_TOKEN_ISSUER")
                .default_value(DEFAULT_TOKEN_ISSUER),
        )
        .arg(
            Arg::new(ARG_TOKEN_AUDIENCE)
                .long(ARG_TOKEN_AUDIENCE)
                .help("Audience embedded in and required from bearer tokens")
                .env("NEWSDESK_TOKEN_AUDIENCE")
                .default_value(DEFAULT_TOKEN_AUDIENCE),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Bearer token lifetime in seconds")
                .env("NEWSDESK_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_login_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOGIN_RATE_PER_MINUTE)
                .long(ARG_LOGIN_RATE_PER_MINUTE)
                .help("Sustained login attempts allowed per minute, per IP and per username")
                .env("NEWSDESK_LOGIN_RATE_PER_MINUTE")
                .default_value("10")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_LOGIN_RATE_BURST)
                .long(ARG_LOGIN_RATE_BURST)
                .help("Login attempts allowed in a burst before rate limiting applies")
                .env("NEWSDESK_LOGIN_RATE_BURST")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY_HEADERS)
                .long(ARG_TRUST_PROXY_HEADERS)
                .help("Rate-limit by x-forwarded-for/x-real-ip; only behind a proxy that sets them")
                .env("NEWSDESK_TRUST_PROXY_HEADERS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Admin frontend base URL, allowed as the CORS origin")
                .env("NEWSDESK_FRONTEND_BASE_URL")
                .default_value("https://admin.newsdesk.dev"),
        )
}

fn with_bootstrap_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BOOTSTRAP_ADMIN_USERNAME)
                .long(ARG_BOOTSTRAP_ADMIN_USERNAME)
                .help("Create this admin account at startup if it does not exist")
                .env("NEWSDESK_BOOTSTRAP_ADMIN_USERNAME"),
        )
        .arg(
            Arg::new(ARG_BOOTSTRAP_ADMIN_EMAIL)
                .long(ARG_BOOTSTRAP_ADMIN_EMAIL)
                .help("Email for the bootstrap admin account")
                .env("NEWSDESK_BOOTSTRAP_ADMIN_EMAIL"),
        )
        .arg(
            // Hidden from help; set it through the environment.
            Arg::new(ARG_BOOTSTRAP_ADMIN_PASSWORD)
                .long(ARG_BOOTSTRAP_ADMIN_PASSWORD)
                .env("NEWSDESK_BOOTSTRAP_ADMIN_PASSWORD")
                .hide(true)
                .hide_env_values(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub token_secret: SecretString,
    pub token_issuer: String,
    pub token_audience: String,
    pub token_ttl_seconds: i64,
    pub login_rate_per_minute: u32,
    pub login_rate_burst: u32,
    pub trust_proxy_headers: bool,
    pub frontend_base_url: String,
    pub bootstrap: Option<BootstrapAdmin>,
}

impl Options {
    /// # Errors
    /// Returns an error for a missing secret, a non-positive TTL, or a
    /// partially configured bootstrap admin.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .map(SecretString::from)
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_TOKEN_SECRET}"))?;

        let token_ttl_seconds = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);
        if token_ttl_seconds <= 0 {
            bail!("--{ARG_TOKEN_TTL_SECONDS} must be positive");
        }

        Ok(Self {
            token_secret,
            token_issuer: string_or(matches, ARG_TOKEN_ISSUER, DEFAULT_TOKEN_ISSUER),
            token_audience: string_or(matches, ARG_TOKEN_AUDIENCE, DEFAULT_TOKEN_AUDIENCE),
            token_ttl_seconds,
            login_rate_per_minute: matches
                .get_one::<u32>(ARG_LOGIN_RATE_PER_MINUTE)
                .copied()
                .unwrap_or(DEFAULT_LOGIN_RATE_PER_MINUTE),
            login_rate_burst: matches
                .get_one::<u32>(ARG_LOGIN_RATE_BURST)
                .copied()
                .unwrap_or(DEFAULT_LOGIN_RATE_BURST),
            trust_proxy_headers: matches.get_flag(ARG_TRUST_PROXY_HEADERS),
            frontend_base_url: string_or(
                matches,
                ARG_FRONTEND_BASE_URL,
                "https://admin.newsdesk.dev",
            ),
            bootstrap: parse_bootstrap(matches)?,
        })
    }
}

fn string_or(matches: &ArgMatches, id: &str, default: &str) -> String {
    matches
        .get_one::<String>(id)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn parse_bootstrap(matches: &ArgMatches) -> Result<Option<BootstrapAdmin>> {
    let username = matches.get_one::<String>(ARG_BOOTSTRAP_ADMIN_USERNAME);
    let email = matches.get_one::<String>(ARG_BOOTSTRAP_ADMIN_EMAIL);
    let password = matches.get_one::<String>(ARG_BOOTSTRAP_ADMIN_PASSWORD);

    match (username, email, password) {
        (None, None, None) => Ok(None),
        (Some(username), Some(email), Some(password)) => Ok(Some(BootstrapAdmin {
            username: username.clone(),
            email: email.clone(),
            password: SecretString::from(password.clone()),
        })),
        _ => bail!(
            "bootstrap admin needs --{ARG_BOOTSTRAP_ADMIN_USERNAME}, --{ARG_BOOTSTRAP_ADMIN_EMAIL} and NEWSDESK_BOOTSTRAP_ADMIN_PASSWORD together"
        ),
    }
}
