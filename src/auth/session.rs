use actix_web::cookie::{time, Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
#[cfg(test)]
use mockall::automock;

use crate::config::SessionConfig;
use crate::db::models::UserId;
use crate::error::SessionError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, SessionError> {
        self.sub
            .parse()
            .map_err(|_| SessionError::Invalid("subject is not a user id".into()))
    }
}

/// Marks a browser as authenticated. Implementations hand back the cookie to
/// attach to the response; nothing is stored on a shared request context.
#[cfg_attr(test, automock)]
pub trait AuthSession: Send + Sync {
    /// Start a session for `user_id`, replacing any session cookie the
    /// browser already holds.
    fn establish(&self, user_id: UserId) -> Result<Cookie<'static>, SessionError>;

    /// Cookie that removes the session from the browser.
    fn clear(&self) -> Cookie<'static>;
}

pub struct JwtAuthSession {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    secure: bool,
    expiry: Duration,
}

impl JwtAuthSession {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            cookie_name: config.cookie_name.clone(),
            secure: config.cookie_secure,
            expiry: Duration::hours(config.expiry_hours),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn generate_token(&self, user_id: UserId) -> Result<String, SessionError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.expiry).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Signing(e.to_string()))
    }

    /// Validate a session cookie value and return its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }
}

impl AuthSession for JwtAuthSession {
    fn establish(&self, user_id: UserId) -> Result<Cookie<'static>, SessionError> {
        let token = self.generate_token(user_id)?;
        Ok(Cookie::build(self.cookie_name.clone(), token)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.expiry.num_seconds()))
            .finish())
    }

    fn clear(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(self.cookie_name.clone(), "")
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .finish();
        cookie.make_removal();
        cookie
    }
}
