use actix_web::cookie::Cookie;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::session::AuthSession;
use crate::db::models::{User, UserId};
use crate::directory::UserDirectory;
use crate::error::StoreError;
use crate::tokens::secret::redact;
use crate::tokens::store::TokenStore;

/// Successful redemption: the bound user and the session cookie to set.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session: Cookie<'static>,
}

/// Why a redemption failed. Only for server-side logs; callers must answer
/// every variant the same way.
#[derive(Error, Debug)]
pub enum Rejected {
    #[error("no token supplied")]
    MissingSecret,

    #[error("token unknown or already redeemed")]
    UnknownOrRedeemed,

    #[error("user {0} no longer exists")]
    UserMissing(UserId),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for Rejected {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyRedeemedOrNotFound => Rejected::UnknownOrRedeemed,
            other => Rejected::Backend(other.to_string()),
        }
    }
}

pub struct RedemptionHandler {
    store: Arc<dyn TokenStore>,
    directory: Arc<dyn UserDirectory>,
    session: Arc<dyn AuthSession>,
}

impl RedemptionHandler {
    pub fn new(
        store: Arc<dyn TokenStore>,
        directory: Arc<dyn UserDirectory>,
        session: Arc<dyn AuthSession>,
    ) -> Self {
        Self {
            store,
            directory,
            session,
        }
    }

    /// Consume `secret` and open a session for the user it was issued to.
    ///
    /// The token is spent as soon as the store accepts it; a later failure
    /// (missing user, session error) does not make it usable again.
    pub async fn redeem(&self, secret: &str) -> Result<AuthenticatedUser, Rejected> {
        let result = self.redeem_inner(secret).await;
        match &result {
            Ok(auth) => info!(user_id = auth.user.id, "magic link redeemed"),
            Err(reason) => warn!(
                secret = %redact(secret),
                reason = %reason,
                "magic link rejected"
            ),
        }
        result
    }

    async fn redeem_inner(&self, secret: &str) -> Result<AuthenticatedUser, Rejected> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(Rejected::MissingSecret);
        }

        let user_id = self.store.redeem(secret).await?;

        let user = self
            .directory
            .get_by_id(user_id)
            .await?
            .ok_or(Rejected::UserMissing(user_id))?;

        let session = self
            .session
            .establish(user.id)
            .map_err(|e| Rejected::Backend(e.to_string()))?;

        Ok(AuthenticatedUser { user, session })
    }
}
