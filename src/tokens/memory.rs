use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::db::models::{Token, TokenId, UserId};
use crate::error::StoreError;
use crate::tokens::store::{CampaignFlag, TokenStore};

#[derive(Debug, Default)]
struct Tokens {
    next_id: TokenId,
    by_secret: HashMap<String, Token>,
}

/// Process-local token table with the same semantics as the Postgres store.
/// Intended for tests and single-instance development.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Tokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every token ever created, ordered by id.
    pub async fn all(&self) -> Vec<Token> {
        let tokens = self.tokens.read().await;
        let mut all: Vec<Token> = tokens.by_secret.values().cloned().collect();
        all.sort_by_key(|t| t.id);
        all
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create(
        &self,
        user_id: UserId,
        secret: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenId, StoreError> {
        let mut tokens = self.tokens.write().await;
        if tokens.by_secret.contains_key(secret) {
            return Err(StoreError::DuplicateSecret);
        }
        tokens.next_id += 1;
        let id = tokens.next_id;
        tokens.by_secret.insert(
            secret.to_string(),
            Token {
                id,
                user_id,
                secret: secret.to_string(),
                issued_at,
                redeemed_at: None,
            },
        );
        Ok(id)
    }

    async fn find_active_by_secret(&self, secret: &str) -> Result<Option<Token>, StoreError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .by_secret
            .get(secret)
            .filter(|t| t.is_active())
            .cloned())
    }

    async fn redeem(&self, secret: &str) -> Result<UserId, StoreError> {
        // Check and mark under one write guard.
        let mut tokens = self.tokens.write().await;
        match tokens.by_secret.get_mut(secret) {
            Some(token) if token.redeemed_at.is_none() => {
                token.redeemed_at = Some(Utc::now());
                Ok(token.user_id)
            }
            _ => Err(StoreError::AlreadyRedeemedOrNotFound),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCampaignFlag {
    sent: AtomicBool,
}

impl MemoryCampaignFlag {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignFlag for MemoryCampaignFlag {
    async fn claim(&self) -> Result<bool, StoreError> {
        Ok(self
            .sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok())
    }

    async fn release(&self) -> Result<(), StoreError> {
        self.sent.store(false, Ordering::Release);
        Ok(())
    }

    async fn is_claimed(&self) -> Result<bool, StoreError> {
        Ok(self.sent.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_rejects_duplicate_secret() {
        let store = MemoryTokenStore::new();
        let first = store.create(1, "dup", Utc::now()).await.unwrap();
        assert_eq!(first, 1);

        let err = store.create(2, "dup", Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSecret));
        assert_eq!(store.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_active_hides_redeemed_tokens() {
        let store = MemoryTokenStore::new();
        store.create(9, "abc", Utc::now()).await.unwrap();

        let token = store.find_active_by_secret("abc").await.unwrap().unwrap();
        assert_eq!(token.user_id, 9);

        assert_eq!(store.redeem("abc").await.unwrap(), 9);
        assert!(store.find_active_by_secret("abc").await.unwrap().is_none());
        assert!(store.find_active_by_secret("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redeem_only_once() {
        let store = MemoryTokenStore::new();
        store.create(3, "once", Utc::now()).await.unwrap();

        assert_eq!(store.redeem("once").await.unwrap(), 3);
        assert!(matches!(
            store.redeem("once").await,
            Err(StoreError::AlreadyRedeemedOrNotFound)
        ));
        assert!(matches!(
            store.redeem("never-issued").await,
            Err(StoreError::AlreadyRedeemedOrNotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redeem_single_winner() {
        let store = Arc::new(MemoryTokenStore::new());
        store.create(5, "race", Utc::now()).await.unwrap();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.redeem("race").await.is_ok() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_campaign_flag_claims_once() {
        let flag = MemoryCampaignFlag::new();
        assert!(!flag.is_claimed().await.unwrap());
        assert!(flag.claim().await.unwrap());
        assert!(!flag.claim().await.unwrap());
        assert!(flag.is_claimed().await.unwrap());

        flag.release().await.unwrap();
        assert!(flag.claim().await.unwrap());
    }
}
