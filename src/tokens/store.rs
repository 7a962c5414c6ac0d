use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::db::models::{Token, TokenId, UserId};
use crate::error::StoreError;

/// Durable table of one-time tokens.
///
/// `redeem` is the only mutation of an existing token and must be a single
/// atomic conditional update: it succeeds for exactly one caller per secret,
/// however many race for it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a new unused token. Fails with [`StoreError::DuplicateSecret`]
    /// when the secret is already taken.
    async fn create(
        &self,
        user_id: UserId,
        secret: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenId, StoreError>;

    /// Look up an unused token. Redeemed and unknown secrets both yield `None`.
    async fn find_active_by_secret(&self, secret: &str) -> Result<Option<Token>, StoreError>;

    /// Atomically mark the token consumed and return the bound user.
    /// Fails with [`StoreError::AlreadyRedeemedOrNotFound`] otherwise.
    async fn redeem(&self, secret: &str) -> Result<UserId, StoreError>;
}

/// The persisted "campaign already sent" flag.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CampaignFlag: Send + Sync {
    /// Set the flag if it is unset. Returns `true` only for the caller that
    /// flipped it.
    async fn claim(&self) -> Result<bool, StoreError>;

    /// Unset the flag so a later campaign may run.
    async fn release(&self) -> Result<(), StoreError>;

    async fn is_claimed(&self) -> Result<bool, StoreError>;
}
