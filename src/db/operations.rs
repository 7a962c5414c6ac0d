use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info_span, Instrument};

use crate::config::DatabaseConfig;
use crate::db::models::{Token, TokenId, UserId};
use crate::error::StoreError;
use crate::tokens::store::{CampaignFlag, TokenStore};

/// Option row that records a completed (or running) issuance campaign.
pub const CAMPAIGN_OPTION: &str = "campaign_sent";

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| StoreError::ConnectionError(e.to_string()))
}

/// Create the token and option tables if they are missing.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub struct PgTokenStore {
    pool: Arc<PgPool>,
}

impl PgTokenStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn create(
        &self,
        user_id: UserId,
        secret: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenId, StoreError> {
        let query = r"
            INSERT INTO magic_link_tokens (user_id, token, generated_at)
            VALUES ($1, $2, $3)
            RETURNING id
        ";
        let id = sqlx::query_scalar::<_, i64>(query)
            .bind(user_id)
            .bind(secret)
            .bind(issued_at)
            .fetch_one(self.pool.as_ref())
            .instrument(query_span("INSERT", query))
            .await?;

        Ok(id)
    }

    async fn find_active_by_secret(&self, secret: &str) -> Result<Option<Token>, StoreError> {
        let query = r"
            SELECT id, user_id, token, generated_at, used_at
            FROM magic_link_tokens
            WHERE token = $1 AND used_at IS NULL
        ";
        let token = sqlx::query_as::<_, Token>(query)
            .bind(secret)
            .fetch_optional(self.pool.as_ref())
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(token)
    }

    async fn redeem(&self, secret: &str) -> Result<UserId, StoreError> {
        // The `used_at IS NULL` predicate makes the check part of the write,
        // so concurrent callers serialize on the row and only one matches.
        let query = r"
            UPDATE magic_link_tokens
            SET used_at = NOW()
            WHERE token = $1
              AND used_at IS NULL
            RETURNING user_id
        ";
        let changed = sqlx::query_scalar::<_, i64>(query)
            .bind(secret)
            .fetch_all(self.pool.as_ref())
            .instrument(query_span("UPDATE", query))
            .await?;

        match changed.as_slice() {
            [user_id] => Ok(*user_id),
            [] => Err(StoreError::AlreadyRedeemedOrNotFound),
            rows => Err(StoreError::QueryError(format!(
                "redeem changed {} rows for one secret",
                rows.len()
            ))),
        }
    }
}

pub struct PgCampaignFlag {
    pool: Arc<PgPool>,
}

impl PgCampaignFlag {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignFlag for PgCampaignFlag {
    async fn claim(&self) -> Result<bool, StoreError> {
        let query = r"
            INSERT INTO magic_link_options (name, value)
            VALUES ($1, 'true')
            ON CONFLICT (name) DO NOTHING
        ";
        let result = sqlx::query(query)
            .bind(CAMPAIGN_OPTION)
            .execute(self.pool.as_ref())
            .instrument(query_span("INSERT", query))
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self) -> Result<(), StoreError> {
        let query = "DELETE FROM magic_link_options WHERE name = $1";
        sqlx::query(query)
            .bind(CAMPAIGN_OPTION)
            .execute(self.pool.as_ref())
            .instrument(query_span("DELETE", query))
            .await?;

        Ok(())
    }

    async fn is_claimed(&self) -> Result<bool, StoreError> {
        let query = "SELECT EXISTS (SELECT 1 FROM magic_link_options WHERE name = $1)";
        let claimed = sqlx::query_scalar::<_, bool>(query)
            .bind(CAMPAIGN_OPTION)
            .fetch_one(self.pool.as_ref())
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(claimed)
    }
}
