//! Auth configuration and the process-wide signing secret.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 15 * 60;
pub const DEFAULT_TOKEN_ISSUER: &str = "https://api.newsdesk.dev";
pub const DEFAULT_TOKEN_AUDIENCE: &str = "newsdesk-admin";
pub const DEFAULT_LOGIN_RATE_PER_MINUTE: u32 = 10;
pub const DEFAULT_LOGIN_RATE_BURST: u32 = 5;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    token_issuer: String,
    token_audience: String,
    token_ttl_seconds: i64,
    login_rate_per_minute: u32,
    login_rate_burst: u32,
    trust_proxy_headers: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            token_issuer: DEFAULT_TOKEN_ISSUER.to_string(),
            token_audience: DEFAULT_TOKEN_AUDIENCE.to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            login_rate_per_minute: DEFAULT_LOGIN_RATE_PER_MINUTE,
            login_rate_burst: DEFAULT_LOGIN_RATE_BURST,
            trust_proxy_headers: false,
        }
    }

    #[must_use]
    pub fn with_token_issuer(mut self, issuer: String) -> Self {
        self.token_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_token_audience(mut self, audience: String) -> Self {
        self.token_audience = audience;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_login_rate(mut self, per_minute: u32, burst: u32) -> Self {
        self.login_rate_per_minute = per_minute;
        self.login_rate_burst = burst;
        self
    }

    /// Key the login limiter on `x-forwarded-for` / `x-real-ip` instead of
    /// the socket peer. Only enable behind a proxy that overwrites them.
    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn token_issuer(&self) -> &str {
        &self.token_issuer
    }

    #[must_use]
    pub fn token_audience(&self) -> &str {
        &self.token_audience
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn login_rate_per_minute(&self) -> u32 {
        self.login_rate_per_minute
    }

    #[must_use]
    pub fn login_rate_burst(&self) -> u32 {
        self.login_rate_burst
    }

    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("token signing secret too short: got {actual} bytes, need at least {minimum}")]
    TooShort { actual: usize, minimum: usize },
}

/// HMAC key used to sign and verify bearer tokens.
///
/// Loaded once at startup and shared read-only behind an `Arc`.
pub struct SigningSecret {
    key: SecretString,
}

impl SigningSecret {
    /// 256 bits.
    pub const MIN_LENGTH: usize = 32;

    /// # Errors
    /// Returns `SecretError::TooShort` if the secret has fewer than 32 bytes.
    pub fn new(key: SecretString) -> Result<Self, SecretError> {
        let actual = key.expose_secret().len();
        if actual < Self::MIN_LENGTH {
            return Err(SecretError::TooShort {
                actual,
                minimum: Self::MIN_LENGTH,
            });
        }
        Ok(Self { key })
    }

    pub(super) fn as_bytes(&self) -> &[u8] {
        self.key.expose_secret().as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("length", &self.key.expose_secret().len())
            .finish_non_exhaustive()
    }
}
