use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

use crate::config::MagicLinkConfig;
use crate::db::models::User;
use crate::directory::UserDirectory;
use crate::error::{IssuanceError, StoreError};
use crate::notify::Notifier;
use crate::tokens::secret::{generate_secret, redact};
use crate::tokens::store::{CampaignFlag, TokenStore};

#[derive(Debug, Clone)]
pub struct IssuerConfig {
    pub eligible_role: String,
    pub link_base: Url,
    pub secret_bytes: usize,
    pub max_secret_attempts: u32,
}

impl IssuerConfig {
    pub fn from_settings(config: &MagicLinkConfig) -> Result<Self, IssuanceError> {
        let link_base = config
            .redemption_base()
            .map_err(|e| IssuanceError::InvalidLink(e.to_string()))?;
        Ok(Self {
            eligible_role: config.eligible_role.clone(),
            link_base,
            secret_bytes: config.secret_bytes,
            max_secret_attempts: config.max_secret_attempts,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignReport {
    /// Tokens created, whether or not their email was delivered.
    pub issued: u64,
    pub delivery_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignOutcome {
    /// A campaign was already claimed; nothing was done.
    AlreadySent,
    Completed(CampaignReport),
}

impl CampaignOutcome {
    pub fn issued(&self) -> u64 {
        match self {
            CampaignOutcome::AlreadySent => 0,
            CampaignOutcome::Completed(report) => report.issued,
        }
    }
}

/// Creates and delivers one token per eligible user, at most once per
/// deployment.
pub struct TokenIssuer {
    store: Arc<dyn TokenStore>,
    flag: Arc<dyn CampaignFlag>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    config: IssuerConfig,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn TokenStore>,
        flag: Arc<dyn CampaignFlag>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
        config: IssuerConfig,
    ) -> Self {
        Self {
            store,
            flag,
            directory,
            notifier,
            config,
        }
    }

    /// Run the campaign and return the number of tokens created. Returns 0
    /// without doing anything when a campaign already ran.
    pub async fn issue_all(&self) -> Result<u64, IssuanceError> {
        Ok(self.run_campaign().await?.issued())
    }

    pub async fn already_sent(&self) -> Result<bool, IssuanceError> {
        Ok(self.flag.is_claimed().await?)
    }

    /// Link that redeems `secret`.
    pub fn redemption_url(&self, secret: &str) -> Url {
        let mut url = self.config.link_base.clone();
        url.query_pairs_mut().append_pair("token", secret);
        url
    }

    pub async fn run_campaign(&self) -> Result<CampaignOutcome, IssuanceError> {
        let span = info_span!(
            "campaign",
            id = %Uuid::new_v4(),
            role = %self.config.eligible_role,
            users = tracing::field::Empty
        );
        self.run_claimed().instrument(span).await
    }

    async fn run_claimed(&self) -> Result<CampaignOutcome, IssuanceError> {
        // Claim before listing users so two concurrent triggers cannot both mail.
        if !self.flag.claim().await? {
            info!("campaign already sent, skipping");
            return Ok(CampaignOutcome::AlreadySent);
        }

        let users = match self.directory.list_by_role(&self.config.eligible_role).await {
            Ok(users) => users,
            Err(e) => {
                self.release_claim().await;
                return Err(e.into());
            }
        };

        if users.is_empty() {
            info!("no eligible users, releasing campaign claim");
            self.release_claim().await;
            return Ok(CampaignOutcome::Completed(CampaignReport {
                issued: 0,
                delivery_failures: 0,
            }));
        }

        tracing::Span::current().record("users", users.len());
        let mut report = CampaignReport {
            issued: 0,
            delivery_failures: 0,
        };

        for user in &users {
            let secret = match self.create_token(user).await {
                Ok(secret) => secret,
                Err(e) => {
                    error!(user_id = user.id, issued = report.issued, error = %e, "campaign aborted");
                    return Err(IssuanceError::Aborted {
                        issued: report.issued,
                        cause: Box::new(e),
                    });
                }
            };
            report.issued += 1;

            let link = self.redemption_url(&secret);
            if let Err(e) = self.notifier.send(user, &link).await {
                // The token stays valid; the user just never got the link.
                report.delivery_failures += 1;
                warn!(user_id = user.id, error = %e, "login link delivery failed");
            }
        }

        info!(
            issued = report.issued,
            delivery_failures = report.delivery_failures,
            "campaign complete"
        );
        Ok(CampaignOutcome::Completed(report))
    }

    async fn create_token(&self, user: &User) -> Result<String, IssuanceError> {
        let attempts = self.config.max_secret_attempts;
        for attempt in 1..=attempts {
            let secret = generate_secret(self.config.secret_bytes)?;
            match self.store.create(user.id, &secret, Utc::now()).await {
                Ok(_) => return Ok(secret),
                Err(StoreError::DuplicateSecret) => {
                    warn!(user_id = user.id, attempt, secret = %redact(&secret), "secret collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(IssuanceError::SecretsExhausted {
            user_id: user.id,
            attempts,
        })
    }

    async fn release_claim(&self) {
        if let Err(e) = self.flag.release().await {
            error!(error = %e, "failed to release campaign claim");
        }
    }
}
