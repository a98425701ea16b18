use chrono::{Datelike, NaiveDate};

use crate::catalog::{Benefit, BenefitCondition};
use crate::geo::{GeoReading, Geofence};

use super::domain::{CartSnapshot, DenialReason, RedemptionContext};

/// Validate the caller's location against the vendor's fence.
///
/// Returns the `geo_validated` flag to record on the decision. In advisory
/// mode a missing or out-of-fence reading proceeds with the flag cleared;
/// when enforcing, both cases deny.
pub(crate) fn validate_geofence(
    fence: Option<&Geofence>,
    reading: Option<&GeoReading>,
    enforce: bool,
) -> Result<bool, DenialReason> {
    let fence = match fence {
        Some(fence) => fence,
        // No fence configured for the vendor means no location requirement.
        None => return Ok(true),
    };

    match reading {
        None if enforce => Err(DenialReason::GeoRequired),
        None => Ok(false),
        Some(reading) => {
            let within = fence.contains(reading);
            if enforce && !within {
                Err(DenialReason::OutOfGeofence)
            } else {
                Ok(within)
            }
        }
    }
}

/// Check every condition on the benefit; the first failure denies.
pub(crate) fn check_conditions(
    benefit: &Benefit,
    cart: Option<&CartSnapshot>,
    context: Option<&RedemptionContext>,
    today: NaiveDate,
) -> Result<(), DenialReason> {
    for condition in &benefit.conditions {
        if !condition_met(condition, cart, context, today) {
            return Err(DenialReason::ConditionNotMet(condition.clone()));
        }
    }
    Ok(())
}

fn condition_met(
    condition: &BenefitCondition,
    cart: Option<&CartSnapshot>,
    context: Option<&RedemptionContext>,
    today: NaiveDate,
) -> bool {
    match condition {
        // Without a cart we cannot prove a bottle purchase, so the
        // exclusion only bites on a declared one.
        BenefitCondition::ExcludeBottlePurchases => {
            !cart.map(|cart| cart.includes_bottles).unwrap_or(false)
        }
        BenefitCondition::PurchaseScope(required) => context
            .and_then(|context| context.purchase_scope)
            .map(|scope| scope == *required)
            .unwrap_or(false),
        BenefitCondition::RequiresPaidItem(item) => {
            cart.map(|cart| cart.paid_count(item) > 0).unwrap_or(false)
        }
        BenefitCondition::Weekday(day) => today.weekday() == *day,
    }
}
