use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifier of a user in the external directory.
pub type UserId = i64;

/// Store-assigned surrogate key of a token row.
pub type TokenId = i64;

/// A one-time login token. `redeemed_at` is `None` while the token is unused.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Token {
    pub id: TokenId,
    pub user_id: UserId,
    #[sqlx(rename = "token")]
    pub secret: String,
    #[sqlx(rename = "generated_at")]
    pub issued_at: DateTime<Utc>,
    #[sqlx(rename = "used_at")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn is_active(&self) -> bool {
        self.redeemed_at.is_none()
    }
}

/// A principal known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub role: String,
}

impl User {
    pub fn new(id: UserId, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: None,
            role: role.into(),
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Name used to greet the user; falls back to the email address.
    pub fn greeting_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_activity() {
        let mut token = Token {
            id: 1,
            user_id: 42,
            secret: "s".into(),
            issued_at: Utc::now(),
            redeemed_at: None,
        };
        assert!(token.is_active());
        token.redeemed_at = Some(Utc::now());
        assert!(!token.is_active());
    }

    #[test]
    fn test_greeting_name() {
        let user = User::new(1, "ann@example.com", "subscriber");
        assert_eq!(user.greeting_name(), "ann@example.com");
        assert_eq!(user.with_first_name("Ann").greeting_name(), "Ann");
    }
}
