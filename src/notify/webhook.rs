use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::NotifierConfig;
use crate::db::models::User;
use crate::error::NotifierError;
use crate::notify::{LoginEmail, Notifier};

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Hands login emails to a mail API over HTTP.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    from_address: String,
    subject: String,
}

impl WebhookNotifier {
    pub fn new(
        endpoint: Url,
        api_key: Option<String>,
        from_address: impl Into<String>,
        subject: impl Into<String>,
    ) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from_address: from_address.into(),
            subject: subject.into(),
        })
    }

    pub fn from_config(config: &NotifierConfig) -> Result<Self, NotifierError> {
        let raw = config
            .webhook_url
            .as_deref()
            .ok_or_else(|| NotifierError::Misconfigured("notifier.webhook_url is not set".into()))?;
        let endpoint = Url::parse(raw).map_err(|e| NotifierError::Misconfigured(e.to_string()))?;
        Self::new(
            endpoint,
            config.api_key.clone(),
            config.from_address.clone(),
            config.subject.clone(),
        )
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, user: &User, link: &Url) -> Result<(), NotifierError> {
        let email = LoginEmail::new(user, link, &self.subject);
        let body = SendRequest {
            to: &email.to,
            from: &self.from_address,
            subject: &email.subject,
            html: &email.html,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Rejected(status.as_u16()));
        }

        debug!(user_id = user.id, status = status.as_u16(), "login email accepted");
        Ok(())
    }
}
