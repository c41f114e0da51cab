//! Shared request state.

use std::sync::Arc;

use crate::auth::{
    AuthConfig, AuthService, PasswordHasher, RateLimiter, SigningSecret, TokenIssuer,
    TokenVerifier,
};
use crate::store::CredentialStore;

pub struct AuthState {
    config: AuthConfig,
    service: AuthService,
    verifier: TokenVerifier,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    /// Wire the auth service and verifier around one signing secret.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        secret: Arc<SigningSecret>,
        store: Arc<dyn CredentialStore>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let issuer = TokenIssuer::new(secret.clone(), &config);
        let verifier = TokenVerifier::new(secret, &config);
        let service = AuthService::new(store, PasswordHasher::new(), issuer);
        Self {
            config,
            service,
            verifier,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn service(&self) -> &AuthService {
        &self.service
    }

    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    pub(crate) fn rate_limiter_handle(&self) -> Arc<dyn RateLimiter> {
        self.rate_limiter.clone()
    }
}
