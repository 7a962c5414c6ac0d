use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

use crate::auth::session::AuthSession;
use crate::error::{AppError, SessionError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RedeemQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: i64,
}

fn redirect(location: &str) -> HttpResponseBuilder {
    let mut builder = HttpResponse::Found();
    builder
        .insert_header((header::LOCATION, location))
        .insert_header((header::CACHE_CONTROL, "no-store"));
    builder
}

/// `GET <redemption_path>?token=<secret>`
///
/// Always answers with a redirect. Every failure produces the same response
/// so a caller cannot tell an unknown token from a spent one.
pub async fn redeem(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let token = web::Query::<RedeemQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().token)
        .unwrap_or_default();

    let links = &state.config.magic_link;
    match state.redemption.redeem(&token).await {
        Ok(auth) => redirect(&links.success_redirect).cookie(auth.session).finish(),
        Err(_) => redirect(&links.failure_redirect).finish(),
    }
}

pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(state.session.clear())
        .json(serde_json::json!({
            "message": "Successfully logged out"
        }))
}

/// Report which user the session cookie belongs to.
pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let cookie = req
        .cookie(state.session.cookie_name())
        .ok_or(SessionError::Missing)?;
    let claims = state.session.decode(cookie.value())?;

    Ok(HttpResponse::Ok().json(SessionResponse {
        user_id: claims.user_id()?,
    }))
}
