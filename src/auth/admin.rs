use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::error::AppError;
use crate::tokens::CampaignOutcome;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CampaignStatus {
    pub already_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub issued: u64,
    pub delivery_failures: u64,
    pub already_sent: bool,
    pub message: String,
}

/// Compare digests so neither the key nor its length leaks through timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let hash_a = Sha256::digest(a);
    let hash_b = Sha256::digest(b);
    hash_a.ct_eq(&hash_b).into()
}

/// Require the operator key that carries the "manage site" privilege.
fn authorize(req: &HttpRequest, state: &AppState) -> Result<(), AppError> {
    let presented = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Forbidden)?;

    if constant_time_eq(presented.as_bytes(), state.config.admin.api_key.as_bytes()) {
        Ok(())
    } else {
        warn!("rejected operator request with wrong key");
        Err(AppError::Forbidden)
    }
}

pub async fn campaign_status(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &state)?;
    let already_sent = state.issuer.already_sent().await?;
    Ok(HttpResponse::Ok().json(CampaignStatus { already_sent }))
}

/// Send the one-time link to every eligible member. Runs at most once.
pub async fn send_campaign(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &state)?;
    info!("operator triggered magic link campaign");

    let response = match state.issuer.run_campaign().await? {
        CampaignOutcome::AlreadySent => CampaignResponse {
            issued: 0,
            delivery_failures: 0,
            already_sent: true,
            message: "You have already emailed the users a confirmation link.".into(),
        },
        CampaignOutcome::Completed(report) if report.issued > 0 => CampaignResponse {
            issued: report.issued,
            delivery_failures: report.delivery_failures,
            already_sent: true,
            message: format!("{} users have been emailed.", report.issued),
        },
        CampaignOutcome::Completed(report) => CampaignResponse {
            issued: 0,
            delivery_failures: report.delivery_failures,
            already_sent: false,
            message: "No emails sent. Please contact the site creators for assistance.".into(),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"operator-key", b"operator-key"));
        assert!(!constant_time_eq(b"operator-key", b"operator-kez"));
        assert!(!constant_time_eq(b"short", b"operator-key"));
    }
}
