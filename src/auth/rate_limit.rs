//! Rate limiting primitives for auth flows.
//!
//! The login handler consults the limiter by client IP and by username before
//! the authentication service runs, so brute-force attempts are rejected
//! without touching the credential store or burning hash time.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Login,
}

impl RateLimitAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
    fn check_username(&self, username: &str, action: RateLimitAction) -> RateLimitDecision;

    /// Drop idle per-key state. Called periodically by the server.
    fn prune(&self) {}
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_username(&self, _username: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// In-process token bucket per IP and per username.
///
/// Limits are per instance; running several replicas multiplies the
/// effective quota by the replica count.
pub struct KeyedRateLimiter {
    by_ip: DefaultKeyedRateLimiter<String>,
    by_username: DefaultKeyedRateLimiter<String>,
}

impl KeyedRateLimiter {
    /// Build a limiter allowing `per_minute` sustained attempts per key with
    /// bursts of up to `burst`. Zero values are clamped to one.
    #[must_use]
    pub fn new(per_minute: u32, burst: u32) -> Self {
        let quota = Quota::per_minute(non_zero(per_minute)).allow_burst(non_zero(burst));
        Self {
            by_ip: Governor::keyed(quota),
            by_username: Governor::keyed(quota),
        }
    }

    fn decide(
        limiter: &DefaultKeyedRateLimiter<String>,
        key: String,
        action: RateLimitAction,
    ) -> RateLimitDecision {
        let key = format!("{}:{key}", action.as_str());
        match limiter.check_key(&key) {
            Ok(()) => RateLimitDecision::Allowed,
            Err(_) => {
                debug!(key = %key, "rate limit exceeded");
                RateLimitDecision::Limited
            }
        }
    }
}

impl RateLimiter for KeyedRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        // Requests without a resolvable client address share one bucket.
        let ip = ip.unwrap_or("unknown").to_string();
        Self::decide(&self.by_ip, ip, action)
    }

    fn check_username(&self, username: &str, action: RateLimitAction) -> RateLimitDecision {
        Self::decide(&self.by_username, username.to_string(), action)
    }

    fn prune(&self) {
        self.by_ip.retain_recent();
        self.by_username.retain_recent();
        self.by_ip.shrink_to_fit();
        self.by_username.shrink_to_fit();
    }
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

/// Periodically prune idle limiter state.
pub fn spawn_pruner(limiter: Arc<dyn RateLimiter>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            limiter.prune();
        }
    });
}
