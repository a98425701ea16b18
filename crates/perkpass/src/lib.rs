//! Loyalty-pass backend for the collective: pass issuance through the badge
//! API and geofenced, once-per-month benefit redemption.

pub mod catalog;
pub mod config;
pub mod error;
pub mod geo;
pub mod issuance;
pub mod redemption;
pub mod telemetry;
