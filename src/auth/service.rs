//! Authentication service and user administration.
//!
//! Login is a short state machine:
//! `AwaitingCredentials -> Verifying -> {Authenticated, Rejected}`.
//! Every rejection is terminal; nothing is retried and nothing is written.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{
    error::AuthError,
    identity::{Identity, NewIdentity, normalize_email, normalize_username},
    password::{PasswordError, PasswordHasher},
    role::Role,
    token::TokenIssuer,
    validation::{FieldError, LoginInput, NewUserInput, validate_login, validate_new_user},
};
use crate::store::CredentialStore;

/// Result of a successful login.
#[derive(Clone, Debug)]
pub struct LoginSuccess {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to create an account. The role is a raw code and is validated
/// together with the other fields.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub role: String,
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::CorruptCredential => Self::CorruptCredential,
            PasswordError::Hash(message) => Self::Internal(message),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
}

impl AuthService {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, issuer: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            issuer,
        }
    }

    /// Authenticate a username and password and issue a token.
    ///
    /// # Errors
    /// - `Validation` if either field is missing or oversized;
    /// - `InvalidCredentials` for an unknown user or a wrong password (indistinguishable);
    /// - `AccountSuspended` for a suspended account with any password;
    /// - `CorruptCredential` if the stored digest cannot be parsed;
    /// - `ServiceUnavailable` if the credential store cannot be reached.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, AuthError> {
        let errors = validate_login(&LoginInput { username, password });
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        let username = normalize_username(username);

        debug!(state = "verifying", "Looking up identity");
        let Some(identity) = self.store.find_by_username(&username).await? else {
            // Same hash cost as a real verification.
            self.verify_dummy(password).await;
            debug!(state = "rejected", "Unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if identity.is_suspended() {
            debug!(state = "rejected", user_id = identity.id, "Account suspended");
            return Err(AuthError::AccountSuspended);
        }

        let matches = self
            .verify_password(password, identity.password_digest.clone())
            .await
            .inspect_err(|err| {
                if matches!(err, AuthError::CorruptCredential) {
                    error!(user_id = identity.id, "Refusing login: stored credential is corrupt");
                }
            })?;
        if !matches {
            debug!(state = "rejected", user_id = identity.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.issuer.issue(&identity)?;
        info!(state = "authenticated", user_id = identity.id, role = %identity.role, "Login succeeded");

        Ok(LoginSuccess {
            id: identity.id,
            username: identity.username,
            email: identity.email,
            role: identity.role,
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Validate, hash and store a new account.
    ///
    /// # Errors
    /// `Validation` for bad input, `Conflict` for a taken username, or a
    /// store/hash failure.
    #[instrument(skip(self, new), fields(username = %new.username))]
    pub async fn create_user(&self, new: NewUser) -> Result<Identity, AuthError> {
        let errors = validate_new_user(&NewUserInput {
            username: &new.username,
            email: &new.email,
            password: new.password.expose_secret(),
            role: &new.role,
        });
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }
        let role = parse_role(&new.role)?;

        let hasher = self.hasher.clone();
        let password = new.password;
        let password_digest =
            tokio::task::spawn_blocking(move || hasher.hash(password.expose_secret()))
                .await
                .map_err(|err| AuthError::Internal(format!("hash task failed: {err}")))??;

        let identity = self
            .store
            .insert(NewIdentity {
                username: normalize_username(&new.username),
                email: normalize_email(&new.email),
                password_digest,
                role,
            })
            .await?;

        info!(user_id = identity.id, role = %identity.role, "User created");
        Ok(identity)
    }

    /// Suspend an account. Existing tokens stay valid until they expire.
    ///
    /// # Errors
    /// `Conflict` when an admin targets their own account, `NotFound` for an
    /// unknown id.
    #[instrument(skip(self))]
    pub async fn suspend(&self, actor_id: i64, user_id: i64) -> Result<Identity, AuthError> {
        if actor_id == user_id {
            warn!("Refusing self-suspension");
            return Err(AuthError::Conflict(
                "cannot suspend your own account".to_string(),
            ));
        }
        let identity = self
            .store
            .set_suspended(user_id, true)
            .await?
            .ok_or(AuthError::NotFound)?;
        info!("User suspended");
        Ok(identity)
    }

    /// # Errors
    /// `NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn unsuspend(&self, user_id: i64) -> Result<Identity, AuthError> {
        let identity = self
            .store
            .set_suspended(user_id, false)
            .await?
            .ok_or(AuthError::NotFound)?;
        info!("User unsuspended");
        Ok(identity)
    }

    /// Change an account's role. Admins cannot re-role themselves, so the
    /// acting admin always remains one.
    ///
    /// # Errors
    /// `Validation` for an unknown role code, `Conflict` when the actor targets
    /// their own account, `NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn change_role(
        &self,
        actor_id: i64,
        user_id: i64,
        role: &str,
    ) -> Result<Identity, AuthError> {
        let role = parse_role(role)?;
        if actor_id == user_id {
            warn!("Refusing self role change");
            return Err(AuthError::Conflict(
                "cannot change your own role".to_string(),
            ));
        }
        let identity = self
            .store
            .set_role(user_id, role)
            .await?
            .ok_or(AuthError::NotFound)?;
        info!(role = %role, "Role changed");
        Ok(identity)
    }

    /// # Errors
    /// Store failures only.
    pub async fn list_users(&self) -> Result<Vec<Identity>, AuthError> {
        Ok(self.store.list().await?)
    }

    /// Fetch the current record for a token subject and reject it if it has
    /// been removed or suspended since the token was issued.
    ///
    /// # Errors
    /// `Forbidden` for a missing subject, `AccountSuspended` for a suspended one.
    pub async fn active_identity(&self, user_id: i64) -> Result<Identity, AuthError> {
        let identity = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Forbidden)?;
        if identity.is_suspended() {
            return Err(AuthError::AccountSuspended);
        }
        Ok(identity)
    }

    /// Create the initial admin account unless the username already exists.
    ///
    /// # Errors
    /// Validation, store or hash failures.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        email: &str,
        password: SecretString,
    ) -> Result<Option<Identity>, AuthError> {
        if self
            .store
            .find_by_username(&normalize_username(username))
            .await?
            .is_some()
        {
            debug!("Bootstrap admin already present");
            return Ok(None);
        }
        let identity = self
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password,
                role: Role::Admin.code().to_string(),
            })
            .await?;
        Ok(Some(identity))
    }

    /// # Errors
    /// `ServiceUnavailable` if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), AuthError> {
        Ok(self.store.ping().await?)
    }

    async fn verify_password(
        &self,
        password: &str,
        digest: SecretString,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = SecretString::from(password.to_string());
        let matches =
            tokio::task::spawn_blocking(move || hasher.verify(password.expose_secret(), &digest))
                .await
                .map_err(|err| AuthError::Internal(format!("verify task failed: {err}")))??;
        Ok(matches)
    }

    async fn verify_dummy(&self, password: &str) {
        let hasher = self.hasher.clone();
        let password = SecretString::from(password.to_string());
        if let Err(err) =
            tokio::task::spawn_blocking(move || hasher.verify_dummy(password.expose_secret())).await
        {
            error!("Dummy verification task failed: {err}");
        }
    }
}

fn parse_role(code: &str) -> Result<Role, AuthError> {
    Role::from_code(code.trim())
        .map_err(|_| AuthError::Validation(vec![FieldError::new("role", "Unknown role")]))
}
