use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{CredentialStore, StoreError};
use crate::auth::{
    identity::{Identity, NewIdentity},
    role::Role,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, Identity>,
}

/// Credential store held in process memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a connectivity outage: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|identity| identity.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, StoreError> {
        self.check_online()?;
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict);
        }
        inner.next_id += 1;
        let identity = Identity {
            id: inner.next_id,
            username: new.username,
            email: new.email,
            password_digest: new.password_digest,
            role: new.role,
            created_at: Utc::now(),
            suspended_at: None,
        };
        inner.users.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn set_suspended(
        &self,
        id: i64,
        suspended: bool,
    ) -> Result<Option<Identity>, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|identity| {
            // Re-suspending keeps the original timestamp.
            if suspended {
                identity.suspended_at.get_or_insert_with(Utc::now);
            } else {
                identity.suspended_at = None;
            }
            identity.clone()
        }))
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<Option<Identity>, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(&id).map(|identity| {
            identity.role = role;
            identity.clone()
        }))
    }

    async fn list(&self) -> Result<Vec<Identity>, StoreError> {
        self.check_online()?;
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}
