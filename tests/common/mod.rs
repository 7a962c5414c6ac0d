#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use magiclink_server::db::{Token, TokenId};
use magiclink_server::error::{NotifierError, StoreError};
use magiclink_server::{
    AppState, MemoryCampaignFlag, MemoryTokenStore, MemoryUserDirectory, Notifier, Settings,
    TokenStore, User, UserId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// Notifier that keeps every link it was asked to deliver.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, Url)>>,
}

impl RecordingNotifier {
    pub fn links(&self) -> Vec<(UserId, Url)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn link_for(&self, user_id: UserId) -> Url {
        self.links()
            .into_iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, url)| url)
            .expect("no link sent to user")
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, user: &User, link: &Url) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push((user.id, link.clone()));
        Ok(())
    }
}

/// Token store that loses its database after `limit` successful inserts.
pub struct FailingStore {
    inner: MemoryTokenStore,
    remaining: AtomicUsize,
}

impl FailingStore {
    pub fn after(limit: usize) -> Self {
        Self {
            inner: MemoryTokenStore::new(),
            remaining: AtomicUsize::new(limit),
        }
    }
}

#[async_trait]
impl TokenStore for FailingStore {
    async fn create(
        &self,
        user_id: UserId,
        secret: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenId, StoreError> {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| StoreError::ConnectionError("database unavailable".into()))?;
        self.inner.create(user_id, secret, issued_at).await
    }

    async fn find_active_by_secret(&self, secret: &str) -> Result<Option<Token>, StoreError> {
        self.inner.find_active_by_secret(secret).await
    }

    async fn redeem(&self, secret: &str) -> Result<UserId, StoreError> {
        self.inner.redeem(secret).await
    }
}

pub fn secret_of(link: &Url) -> String {
    link.query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .expect("link has no token")
}

/// Path and query of a link, as sent by a browser.
pub fn request_uri(link: &Url) -> String {
    format!("{}?{}", link.path(), link.query().unwrap_or_default())
}

pub fn subscribers(ids: impl IntoIterator<Item = UserId>) -> MemoryUserDirectory {
    MemoryUserDirectory::with_users(ids.into_iter().map(|id| {
        User::new(id, format!("member{}@example.com", id), "subscriber")
            .with_first_name(format!("Member{}", id))
    }))
}

pub struct Harness {
    pub settings: Settings,
    pub state: AppState,
    pub store: Arc<MemoryTokenStore>,
    pub flag: Arc<MemoryCampaignFlag>,
    pub directory: Arc<MemoryUserDirectory>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(directory: MemoryUserDirectory) -> Self {
        let settings = Settings::new_for_test().expect("Failed to load test config");
        let store = Arc::new(MemoryTokenStore::new());
        let flag = Arc::new(MemoryCampaignFlag::new());
        let directory = Arc::new(directory);
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState::with_backends(
            settings.clone(),
            store.clone(),
            flag.clone(),
            directory.clone(),
            notifier.clone(),
        )
        .expect("Failed to build state");

        Self {
            settings,
            state,
            store,
            flag,
            directory,
            notifier,
        }
    }
}
