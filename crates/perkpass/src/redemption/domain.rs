use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::catalog::{BenefitCondition, BenefitKey, CounterName, PurchaseScope, VendorKey};
use crate::geo::GeoReading;

/// Identifier wrapper for an issued pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassId(pub String);

impl std::fmt::Display for PassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared contents of the order a benefit is applied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    #[serde(default)]
    pub includes_bottles: bool,
    /// Paid item counts keyed by item name, e.g. `{"scoop": 2}`.
    #[serde(default)]
    pub paid_items: BTreeMap<String, u32>,
}

impl CartSnapshot {
    pub fn paid_count(&self, item: &str) -> u32 {
        self.paid_items.get(item).copied().unwrap_or(0)
    }
}

/// Caller-declared context for scope-limited benefits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionContext {
    #[serde(default)]
    pub purchase_scope: Option<PurchaseScope>,
}

/// One redemption attempt, owned by the handling request.
#[derive(Debug, Clone, PartialEq)]
pub struct RedemptionRequest {
    pub pass_id: String,
    pub vendor: VendorKey,
    pub benefit: BenefitKey,
    pub geo: Option<GeoReading>,
    pub cart: Option<CartSnapshot>,
    pub context: Option<RedemptionContext>,
}

/// Business-rule denial. These are ordinary outcomes, not failures; each
/// carries a stable machine-readable wire code.
#[derive(Debug, Clone, PartialEq)]
pub enum DenialReason {
    MissingPassId,
    UnknownBenefit,
    GeoRequired,
    OutOfGeofence,
    ConditionNotMet(BenefitCondition),
    LimitReached,
}

impl DenialReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::MissingPassId => "MISSING_PASS_ID",
            DenialReason::UnknownBenefit => "UNKNOWN_BENEFIT",
            DenialReason::GeoRequired => "GEO_REQUIRED",
            DenialReason::OutOfGeofence => "OUT_OF_GEOFENCE",
            DenialReason::ConditionNotMet(_) => "CONDITION_NOT_MET",
            DenialReason::LimitReached => "LIMIT_REACHED",
        }
    }

    pub fn summary(&self) -> String {
        match self {
            DenialReason::MissingPassId => "request is missing a pass id".to_string(),
            DenialReason::UnknownBenefit => "vendor/benefit pair is not in the catalog".to_string(),
            DenialReason::GeoRequired => "a location reading is required to redeem".to_string(),
            DenialReason::OutOfGeofence => "reported location is outside the shop".to_string(),
            DenialReason::ConditionNotMet(condition) => {
                format!("benefit condition not met: {}", condition.label())
            }
            DenialReason::LimitReached => "benefit already used this month".to_string(),
        }
    }
}

/// Remaining counts per counter, string-encoded the way the external pass
/// attributes carry them.
pub type BalanceMap = BTreeMap<CounterName, String>;

/// Outcome of a redemption attempt plus the pass's current balances.
#[derive(Debug, Clone, PartialEq)]
pub struct RedemptionDecision {
    pub approved: bool,
    pub reason: Option<DenialReason>,
    pub geo_validated: bool,
    pub balances: BalanceMap,
}

impl RedemptionDecision {
    pub(crate) fn approved(geo_validated: bool, balances: BalanceMap) -> Self {
        Self {
            approved: true,
            reason: None,
            geo_validated,
            balances,
        }
    }

    pub(crate) fn denied(reason: DenialReason, geo_validated: bool, balances: BalanceMap) -> Self {
        Self {
            approved: false,
            reason: Some(reason),
            geo_validated,
            balances,
        }
    }
}

/// Calendar-month key for the monthly counter reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthStamp {
    pub year: i32,
    pub month: u32,
}

impl MonthStamp {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_stamp_distinguishes_rollovers() {
        let december = MonthStamp::from_date(NaiveDate::from_ymd_opt(2025, 12, 31).expect("date"));
        let january = MonthStamp::from_date(NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"));
        assert_ne!(december, january);
        assert_eq!(january, MonthStamp { year: 2026, month: 1 });
    }

    #[test]
    fn denial_codes_are_stable() {
        assert_eq!(DenialReason::MissingPassId.code(), "MISSING_PASS_ID");
        assert_eq!(DenialReason::OutOfGeofence.code(), "OUT_OF_GEOFENCE");
        assert_eq!(
            DenialReason::ConditionNotMet(BenefitCondition::ExcludeBottlePurchases).code(),
            "CONDITION_NOT_MET"
        );
        assert_eq!(DenialReason::LimitReached.code(), "LIMIT_REACHED");
    }

    #[test]
    fn cart_counts_missing_items_as_zero() {
        let cart = CartSnapshot::default();
        assert_eq!(cart.paid_count("scoop"), 0);

        let mut paid = BTreeMap::new();
        paid.insert("scoop".to_string(), 2);
        let cart = CartSnapshot {
            includes_bottles: false,
            paid_items: paid,
        };
        assert_eq!(cart.paid_count("scoop"), 2);
    }
}
