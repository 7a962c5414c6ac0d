//! Authentication module for the magic link server
//!
//! Session cookies, the redemption endpoint and the operator-only campaign
//! trigger.

pub mod admin;
pub mod handlers;
pub mod session;

pub use session::{AuthSession, Claims, JwtAuthSession};
