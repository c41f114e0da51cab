//! HS256 bearer tokens.
//!
//! Tokens are compact JWTs: `base64url(header).base64url(claims).base64url(mac)`
//! where `mac = HMAC-SHA256(secret, header "." claims)`. Verification is
//! stateless and runs in a fixed order: structure, signature, claims, expiry.
//!
//! The embedded role is the role at issuance time. Role changes and
//! suspensions made afterwards are not seen by `TokenVerifier` until the
//! token expires; operations that need current state must re-read the
//! identity from the credential store.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use std::sync::Arc;
use tracing::debug;
use ulid::Ulid;

use super::config::{AuthConfig, SigningSecret};
use super::error::AuthError;
use super::identity::Identity;
use super::role::Role;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_VERSION: u8 = 1;
const ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    pub v: u8,
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Caller identity reconstructed from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub issued_at: i64,
    pub expires_at: i64,
    pub token_id: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value)
        .map_err(|err| AuthError::Internal(format!("failed to encode token segment: {err}")))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, AuthError> {
    Base64UrlUnpadded::decode_vec(segment).map_err(|_| AuthError::MalformedToken)
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AuthError> {
    serde_json::from_slice(bytes).map_err(|err| {
        debug!("Token segment is not valid JSON: {err}");
        AuthError::MalformedToken
    })
}

fn new_mac(secret: &SigningSecret) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AuthError::Internal("invalid HMAC key length".to_string()))
}

/// Signs tokens for authenticated identities.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
    secret: Arc<SigningSecret>,
    issuer: String,
    audience: String,
    ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: Arc<SigningSecret>, config: &AuthConfig) -> Self {
        Self {
            secret,
            issuer: config.token_issuer().to_string(),
            audience: config.token_audience().to_string(),
            ttl_seconds: config.token_ttl_seconds(),
        }
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token valid from now for the configured TTL.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the claims cannot be encoded.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, AuthError> {
        self.issue_at(identity, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now_unix_seconds`.
    ///
    /// # Errors
    /// Returns `AuthError::Internal` if the claims cannot be encoded.
    pub fn issue_at(
        &self,
        identity: &Identity,
        now_unix_seconds: i64,
    ) -> Result<IssuedToken, AuthError> {
        let exp = now_unix_seconds.saturating_add(self.ttl_seconds);
        let claims = TokenClaims {
            v: TOKEN_VERSION,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: identity.id.to_string(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iat: now_unix_seconds,
            exp,
            jti: Ulid::new().to_string(),
        };

        let header_b64 = encode_json(&TokenHeader::hs256())?;
        let claims_b64 = encode_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = new_mac(&self.secret)?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| AuthError::Internal("token expiry out of range".to_string()))?;

        Ok(IssuedToken {
            token: format!("{signing_input}.{signature_b64}"),
            expires_at,
        })
    }
}

/// Verifies bearer tokens without touching the credential store.
#[derive(Clone, Debug)]
pub struct TokenVerifier {
    secret: Arc<SigningSecret>,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(secret: Arc<SigningSecret>, config: &AuthConfig) -> Self {
        Self {
            secret,
            issuer: config.token_issuer().to_string(),
            audience: config.token_audience().to_string(),
        }
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    /// See [`TokenVerifier::verify_at`].
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the current time were `now_unix_seconds`.
    ///
    /// # Errors
    /// - `MalformedToken` if the token is not three base64url segments, the
    ///   header does not name HS256, or the claims do not decode;
    /// - `InvalidSignature` if the MAC does not match;
    /// - `ForeignToken` if issuer or audience differ from this service;
    /// - `Expired` if `exp <= now`.
    pub fn verify_at(
        &self,
        token: &str,
        now_unix_seconds: i64,
    ) -> Result<VerifiedToken, AuthError> {
        // 1. structure
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(AuthError::MalformedToken)?;
        let claims_b64 = parts.next().ok_or(AuthError::MalformedToken)?;
        let signature_b64 = parts.next().ok_or(AuthError::MalformedToken)?;
        if parts.next().is_some() {
            return Err(AuthError::MalformedToken);
        }

        let header: TokenHeader = decode_json(&decode_segment(header_b64)?)?;
        if header.alg != ALGORITHM {
            debug!("Rejecting token with alg {}", header.alg);
            return Err(AuthError::MalformedToken);
        }
        let claims_bytes = decode_segment(claims_b64)?;
        let signature = decode_segment(signature_b64)?;

        // 2. signature
        let mut mac = new_mac(&self.secret)?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        // 3. claims
        let claims: TokenClaims = decode_json(&claims_bytes)?;
        if claims.v != TOKEN_VERSION {
            return Err(AuthError::MalformedToken);
        }
        let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::MalformedToken)?;
        if claims.iss != self.issuer || claims.aud != self.audience {
            return Err(AuthError::ForeignToken);
        }

        // 4. expiry
        if claims.exp <= now_unix_seconds {
            return Err(AuthError::Expired);
        }

        Ok(VerifiedToken {
            user_id,
            username: claims.username,
            email: claims.email,
            role: claims.role,
            issued_at: claims.iat,
            expires_at: claims.exp,
            token_id: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use secrecy::SecretString;

    const NOW: i64 = 1_700_000_000;

    fn secret(key: &str) -> Arc<SigningSecret> {
        match SigningSecret::new(SecretString::from(key.repeat(32))) {
            Ok(secret) => Arc::new(secret),
            Err(err) => panic!("test secret rejected: {err}"),
        }
    }

    fn config() -> AuthConfig {
        AuthConfig::new("https://admin.newsdesk.dev".to_string()).with_token_ttl_seconds(600)
    }

    fn alice() -> Identity {
        Identity {
            id: 42,
            username: "alice".to_string(),
            email: "alice@newsdesk.dev".to_string(),
            password_digest: SecretString::from("unused".to_string()),
            role: Role::Editor,
            created_at: Utc::now(),
            suspended_at: None,
        }
    }

    fn pair(key: &str) -> (TokenIssuer, TokenVerifier) {
        let secret = secret(key);
        let config = config();
        (
            TokenIssuer::new(secret.clone(), &config),
            TokenVerifier::new(secret, &config),
        )
    }

    fn forge(header: &serde_json::Value, claims: &serde_json::Value, key: &str) -> String {
        let header_b64 = Base64UrlUnpadded::encode_string(header.to_string().as_bytes());
        let claims_b64 = Base64UrlUnpadded::encode_string(claims.to_string().as_bytes());
        let signing_input = format!("{header_b64}.{claims_b64}");
        let mut mac = match HmacSha256::new_from_slice(key.repeat(32).as_bytes()) {
            Ok(mac) => mac,
            Err(err) => panic!("hmac init: {err}"),
        };
        mac.update(signing_input.as_bytes());
        let sig = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());
        format!("{signing_input}.{sig}")
    }

    fn valid_claims() -> serde_json::Value {
        serde_json::json!({
            "v": TOKEN_VERSION,
            "iss": config().token_issuer(),
            "aud": config().token_audience(),
            "sub": "42",
            "username": "alice",
            "email": "alice@newsdesk.dev",
            "role": "editor",
            "iat": NOW,
            "exp": NOW + 600,
            "jti": "01HZZZZZZZZZZZZZZZZZZZZZZZ",
        })
    }

    #[test]
    fn issued_token_verifies_before_expiry() -> Result<(), AuthError> {
        let (issuer, verifier) = pair("k");
        let issued = issuer.issue_at(&alice(), NOW)?;
        assert_eq!(issued.expires_at.timestamp(), NOW + 600);

        let verified = verifier.verify_at(&issued.token, NOW + 599)?;
        assert_eq!(verified.user_id, 42);
        assert_eq!(verified.username, "alice");
        assert_eq!(verified.email, "alice@newsdesk.dev");
        assert_eq!(verified.role, Role::Editor);
        assert_eq!(verified.issued_at, NOW);
        assert_eq!(verified.expires_at, NOW + 600);
        Ok(())
    }

    #[test]
    fn token_expires_at_exp() -> Result<(), AuthError> {
        let (issuer, verifier) = pair("k");
        let issued = issuer.issue_at(&alice(), NOW)?;
        assert!(matches!(
            verifier.verify_at(&issued.token, NOW + 600),
            Err(AuthError::Expired)
        ));
        assert!(matches!(
            verifier.verify_at(&issued.token, NOW + 601),
            Err(AuthError::Expired)
        ));
        Ok(())
    }

    #[test]
    fn token_ids_are_unique() -> Result<(), AuthError> {
        let (issuer, verifier) = pair("k");
        let first = verifier.verify_at(&issuer.issue_at(&alice(), NOW)?.token, NOW)?;
        let second = verifier.verify_at(&issuer.issue_at(&alice(), NOW)?.token, NOW)?;
        assert_ne!(first.token_id, second.token_id);
        Ok(())
    }

    #[test]
    fn other_secret_is_invalid_signature() -> Result<(), AuthError> {
        let (issuer, _) = pair("a");
        let (_, verifier) = pair("b");
        let issued = issuer.issue_at(&alice(), NOW)?;
        assert!(matches!(
            verifier.verify_at(&issued.token, NOW),
            Err(AuthError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn signature_is_checked_before_expiry() -> Result<(), AuthError> {
        let (issuer, _) = pair("a");
        let (_, verifier) = pair("b");
        let issued = issuer.issue_at(&alice(), NOW)?;
        assert!(matches!(
            verifier.verify_at(&issued.token, NOW + 10_000),
            Err(AuthError::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let (_, verifier) = pair("k");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**", "e30.e30.e30"] {
            assert!(
                matches!(verifier.verify_at(token, NOW), Err(AuthError::MalformedToken)),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn alg_none_is_malformed() {
        let (_, verifier) = pair("k");
        let token = forge(
            &serde_json::json!({"alg": "none", "typ": "JWT"}),
            &valid_claims(),
            "k",
        );
        assert!(matches!(
            verifier.verify_at(&token, NOW),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn forged_claims_with_right_key_verify() -> Result<(), AuthError> {
        let (_, verifier) = pair("k");
        let token = forge(
            &serde_json::json!({"alg": "HS256", "typ": "JWT"}),
            &valid_claims(),
            "k",
        );
        assert_eq!(verifier.verify_at(&token, NOW)?.user_id, 42);
        Ok(())
    }

    #[test]
    fn unknown_role_code_is_malformed_even_when_signed() {
        let (_, verifier) = pair("k");
        let mut claims = valid_claims();
        claims["role"] = serde_json::json!("superuser");
        let token = forge(&serde_json::json!({"alg": "HS256", "typ": "JWT"}), &claims, "k");
        assert!(matches!(
            verifier.verify_at(&token, NOW),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn non_numeric_subject_is_malformed() {
        let (_, verifier) = pair("k");
        let mut claims = valid_claims();
        claims["sub"] = serde_json::json!("alice");
        let token = forge(&serde_json::json!({"alg": "HS256", "typ": "JWT"}), &claims, "k");
        assert!(matches!(
            verifier.verify_at(&token, NOW),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn wrong_audience_or_issuer_is_foreign() {
        let (_, verifier) = pair("k");
        let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});

        let mut claims = valid_claims();
        claims["aud"] = serde_json::json!("billing");
        let token = forge(&header, &claims, "k");
        assert!(matches!(
            verifier.verify_at(&token, NOW),
            Err(AuthError::ForeignToken)
        ));

        let mut claims = valid_claims();
        claims["iss"] = serde_json::json!("https://elsewhere.test");
        let token = forge(&header, &claims, "k");
        assert!(matches!(
            verifier.verify_at(&token, NOW),
            Err(AuthError::ForeignToken)
        ));
    }

    #[test]
    fn role_is_frozen_at_issuance() -> Result<(), AuthError> {
        let (issuer, verifier) = pair("k");
        let mut identity = alice();
        let issued = issuer.issue_at(&identity, NOW)?;

        identity.role = Role::Reader;
        identity.suspended_at = Some(Utc::now());

        let verified = verifier.verify_at(&issued.token, NOW + 1)?;
        assert_eq!(verified.role, Role::Editor);
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn tampering_never_verifies(position in any::<prop::sample::Index>(), replacement in "[A-Za-z0-9_.=+/-]") {
            let (issuer, verifier) = pair("k");
            let issued = issuer.issue_at(&alice(), NOW).map_err(|e| TestCaseError::fail(e.to_string()))?;

            let mut chars: Vec<char> = issued.token.chars().collect();
            let index = position.index(chars.len());
            let replacement = replacement.chars().next().unwrap_or('A');
            prop_assume!(chars[index] != replacement);
            chars[index] = replacement;
            let tampered: String = chars.into_iter().collect();

            let result = verifier.verify_at(&tampered, NOW);
            prop_assert!(
                matches!(result, Err(AuthError::InvalidSignature | AuthError::MalformedToken)),
                "tampered token was not rejected correctly: {result:?}"
            );
        }
    }
}
