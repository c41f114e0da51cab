//! Bearer token extraction and authorization helpers.
//!
//! Flow Overview: read the `Authorization: Bearer` header, verify the token
//! offline, and return a principal built from its claims. Endpoints that need
//! fresh state (suspension, current role) call [`Principal::require_active`].

use axum::http::{HeaderMap, header::AUTHORIZATION};
use std::net::{IpAddr, SocketAddr};

use crate::auth::{AuthError, AuthService, Identity, Role, TokenVerifier, VerifiedToken};

/// Authenticated caller as described by a verified token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl From<VerifiedToken> for Principal {
    fn from(token: VerifiedToken) -> Self {
        Self {
            user_id: token.user_id,
            username: token.username,
            email: token.email,
            role: token.role,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        }
    }
}

impl Principal {
    /// Reject callers whose token role is outside `allowed`.
    ///
    /// # Errors
    /// Returns `AuthError::Forbidden`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AuthError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Re-fetch the caller and reject it if it was removed or suspended after
    /// the token was issued.
    ///
    /// # Errors
    /// `Forbidden`, `AccountSuspended` or a store failure.
    pub async fn require_active(&self, service: &AuthService) -> Result<Identity, AuthError> {
        service.active_identity(self.user_id).await
    }
}

/// Verify the bearer token in `headers`.
///
/// # Errors
/// `MissingToken` when there is no bearer credential, otherwise whatever the
/// verifier rejects the token with.
pub fn require_auth(headers: &HeaderMap, verifier: &TokenVerifier) -> Result<Principal, AuthError> {
    let token = bearer_token(headers)?;
    verifier.verify(token).map(Principal::from)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(token)
}

/// Address the login limiter keys on.
///
/// Forwarding headers are client-controlled unless a proxy in front rewrites
/// them, so they are read only when `trust_proxy_headers` is set. A proxy
/// appends the peer it saw, so the last `x-forwarded-for` hop is the one it
/// vouches for. Otherwise the socket peer is used.
pub(crate) fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> Option<IpAddr> {
    if trust_proxy_headers {
        let forwarded = header_str(headers, "x-forwarded-for").and_then(|chain| {
            chain
                .rsplit(',')
                .map(str::trim)
                .find(|hop| !hop.is_empty())
                .and_then(|hop| hop.parse::<IpAddr>().ok())
        });
        let proxied = forwarded
            .or_else(|| header_str(headers, "x-real-ip").and_then(|ip| ip.trim().parse().ok()));
        if proxied.is_some() {
            return proxied;
        }
    }
    peer.map(|addr| addr.ip())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: 1,
            username: "alice".to_string(),
            email: "alice@newsdesk.dev".to_string(),
            role,
            issued_at: 0,
            expires_at: 900,
        }
    }

    #[test]
    fn require_role_checks_membership() {
        assert!(principal(Role::Admin).require_role(&[Role::Admin]).is_ok());
        assert!(matches!(
            principal(Role::Editor).require_role(&[Role::Admin]),
            Err(AuthError::Forbidden)
        ));
        assert!(
            principal(Role::Editor)
                .require_role(&[Role::Admin, Role::Editor])
                .is_ok()
        );
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::MalformedToken)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer a.b.c"));
        assert_eq!(bearer_token(&headers).ok(), Some("a.b.c"));
    }


    fn forwarded(chain: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(chain));
        headers
    }

    fn peer() -> Option<SocketAddr> {
        Some(SocketAddr::from(([192, 0, 2, 10], 40_000)))
    }

    #[test]
    fn forwarding_headers_ignored_unless_trusted() {
        let headers = forwarded("203.0.113.5");
        assert_eq!(
            client_ip(&headers, peer(), false),
            Some(IpAddr::from([192, 0, 2, 10]))
        );
        assert_eq!(client_ip(&headers, None, false), None);
    }

    #[test]
    fn trusted_proxy_uses_last_forwarded_hop() {
        // The client wrote the first hop; the proxy appended the second.
        let headers = forwarded("1.2.3.4, 203.0.113.5");
        assert_eq!(
            client_ip(&headers, peer(), true),
            Some(IpAddr::from([203, 0, 113, 5]))
        );
    }

    #[test]
    fn trusted_proxy_falls_back_to_real_ip_then_peer() {
        let mut headers = forwarded("not-an-ip");
        assert_eq!(
            client_ip(&headers, peer(), true),
            Some(IpAddr::from([192, 0, 2, 10]))
        );
        headers.insert("x-real-ip", HeaderValue::from_static(" 2001:db8::7 "));
        assert_eq!(
            client_ip(&headers, peer(), true),
            "2001:db8::7".parse::<IpAddr>().ok()
        );
    }
}
