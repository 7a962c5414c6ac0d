//! Database module for the magic link server
//!
//! Postgres-backed implementations of the token store, the campaign flag
//! and the user directory, plus connection and migration helpers.

pub mod directory;
pub mod models;
pub mod operations;

pub use directory::PgUserDirectory;
pub use models::{Token, TokenId, User, UserId};
pub use operations::{PgCampaignFlag, PgTokenStore};
