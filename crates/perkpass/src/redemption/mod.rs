//! Redemption decision engine: geofence validation, benefit eligibility,
//! and monthly balance accounting behind a single service facade.

pub mod domain;
pub(crate) mod engine;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    BalanceMap, CartSnapshot, DenialReason, MonthStamp, PassId, RedemptionContext,
    RedemptionDecision, RedemptionRequest,
};
pub use router::redemption_router;
pub use service::{RedemptionService, RedemptionServiceError};
pub use store::{BalanceStore, RedeemOutcome, StoreError};
