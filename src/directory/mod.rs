//! Read access to the external user directory.
//!
//! Tokens only hold a weak reference (`UserId`) to a directory user; the
//! directory is consulted at issuance to find eligible users and again at
//! redemption to confirm the bound user still exists.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
#[cfg(test)]
use mockall::automock;

use crate::db::models::{User, UserId};
use crate::error::StoreError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_by_role(&self, role: &str) -> Result<Vec<User>, StoreError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
}

/// Directory held in memory, used by tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<BTreeMap<UserId, User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn remove(&self, id: UserId) -> Option<User> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn list_by_role(&self, role: &str) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| u.role == role).cloned().collect())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}
