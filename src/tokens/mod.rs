//! One-time token lifecycle: generation, storage, issuance and redemption.

pub mod issuer;
pub mod memory;
pub mod redemption;
pub mod secret;
pub mod store;

pub use issuer::{CampaignOutcome, CampaignReport, IssuerConfig, TokenIssuer};
pub use memory::{MemoryCampaignFlag, MemoryTokenStore};
pub use redemption::{AuthenticatedUser, Rejected, RedemptionHandler};
pub use secret::generate_secret;
pub use store::{CampaignFlag, TokenStore};
