//! Delivery of login links to users.

mod webhook;

use async_trait::async_trait;
use tracing::info;
use url::Url;
#[cfg(test)]
use mockall::automock;

use crate::db::models::User;
use crate::error::NotifierError;

pub use webhook::WebhookNotifier;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user: &User, link: &Url) -> Result<(), NotifierError>;
}

/// Rendered login email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl LoginEmail {
    pub fn new(user: &User, link: &Url, subject: &str) -> Self {
        let html = format!(
            "<p>Dear {},<br>\nPlease click on this link to log into the site:<br><br>{}<br><br></p>",
            user.greeting_name(),
            link
        );
        Self {
            to: user.email.clone(),
            subject: subject.to_string(),
            html,
        }
    }
}

/// Writes the link to the log instead of sending mail. Development only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, user: &User, link: &Url) -> Result<(), NotifierError> {
        info!(user_id = user.id, to_email = %user.email, link = %link, "login link send stub");
        Ok(())
    }
}
