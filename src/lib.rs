pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod notify;
pub mod tokens;

use std::sync::Arc;
use actix_web::{web, HttpResponse};
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{AuthSession, JwtAuthSession};
pub use db::{Token, User, UserId};
pub use directory::{MemoryUserDirectory, UserDirectory};
pub use notify::{LogNotifier, Notifier, WebhookNotifier};
pub use tokens::{
    CampaignFlag, IssuerConfig, MemoryCampaignFlag, MemoryTokenStore, RedemptionHandler,
    TokenIssuer, TokenStore,
};

use crate::config::NotifierKind;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Register every route on an actix `App`.
pub fn configure_routes(cfg: &mut web::ServiceConfig, settings: &Settings) {
    cfg.route("/health", web::get().to(health_check))
        .route(
            &settings.magic_link.redemption_path,
            web::get().to(auth::handlers::redeem),
        )
        .route("/auth/logout", web::post().to(auth::handlers::logout))
        .route("/auth/me", web::get().to(auth::handlers::me))
        .service(
            web::resource("/admin/magic-links")
                .route(web::get().to(auth::admin::campaign_status))
                .route(web::post().to(auth::admin::send_campaign)),
        );
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub issuer: Arc<TokenIssuer>,
    pub redemption: Arc<RedemptionHandler>,
    pub session: Arc<JwtAuthSession>,
}

impl AppState {
    /// Connect to Postgres, run migrations and wire the production backends.
    pub async fn new(config: Settings) -> Result<Self> {
        let pool = Arc::new(db::operations::connect(&config.database).await?);
        db::operations::migrate(&pool).await?;
        info!("Database migrations applied");

        let notifier: Arc<dyn Notifier> = match config.notifier.kind {
            NotifierKind::Log => Arc::new(LogNotifier),
            NotifierKind::Webhook => Arc::new(WebhookNotifier::from_config(&config.notifier)?),
        };

        Self::with_backends(
            config,
            Arc::new(db::PgTokenStore::new(pool.clone())),
            Arc::new(db::PgCampaignFlag::new(pool.clone())),
            Arc::new(db::PgUserDirectory::new(pool)),
            notifier,
        )
    }

    /// Wire the state from explicit backends, e.g. the in-memory ones.
    pub fn with_backends(
        config: Settings,
        store: Arc<dyn TokenStore>,
        flag: Arc<dyn CampaignFlag>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let session = Arc::new(JwtAuthSession::new(&config.session));
        let issuer = TokenIssuer::new(
            store.clone(),
            flag,
            directory.clone(),
            notifier,
            IssuerConfig::from_settings(&config.magic_link)?,
        );
        let redemption = RedemptionHandler::new(store, directory, session.clone());

        Ok(Self {
            config: Arc::new(config),
            issuer: Arc::new(issuer),
            redemption: Arc::new(redemption),
            session,
        })
    }
}
