use std::sync::Arc;

use chrono::NaiveDate;

use crate::catalog::BenefitCatalog;
use crate::geo::GeofenceSet;

use super::domain::{
    BalanceMap, DenialReason, MonthStamp, PassId, RedemptionDecision, RedemptionRequest,
};
use super::engine;
use super::store::{BalanceStore, RedeemOutcome, StoreError};

/// Service composing the geofence check, benefit catalog, condition engine,
/// and balance store into a single approve/deny decision.
pub struct RedemptionService<S> {
    catalog: Arc<BenefitCatalog>,
    fences: Arc<GeofenceSet>,
    store: Arc<S>,
    enforce_geofence: bool,
}

impl<S> RedemptionService<S>
where
    S: BalanceStore + 'static,
{
    pub fn new(
        catalog: Arc<BenefitCatalog>,
        fences: Arc<GeofenceSet>,
        store: Arc<S>,
        enforce_geofence: bool,
    ) -> Self {
        Self {
            catalog,
            fences,
            store,
            enforce_geofence,
        }
    }

    pub fn catalog(&self) -> &BenefitCatalog {
        &self.catalog
    }

    pub fn enforces_geofence(&self) -> bool {
        self.enforce_geofence
    }

    /// Decide one redemption attempt.
    ///
    /// Denials never touch the store; an approval decrements exactly the
    /// targeted counter by one, clamped at zero. `today` drives both the
    /// weekday conditions and the monthly counter reset.
    pub fn redeem(
        &self,
        request: &RedemptionRequest,
        today: NaiveDate,
    ) -> Result<RedemptionDecision, RedemptionServiceError> {
        let month = MonthStamp::from_date(today);

        if request.pass_id.trim().is_empty() {
            return Ok(RedemptionDecision::denied(
                DenialReason::MissingPassId,
                false,
                BalanceMap::new(),
            ));
        }
        let pass = PassId(request.pass_id.clone());

        let benefit = match self.catalog.lookup(&request.vendor, &request.benefit) {
            Some(benefit) => benefit,
            None => {
                return Ok(RedemptionDecision::denied(
                    DenialReason::UnknownBenefit,
                    false,
                    self.snapshot(&pass, month)?,
                ));
            }
        };

        let fence = self.fences.fence_for(&request.vendor);
        let geo_validated =
            match engine::validate_geofence(fence, request.geo.as_ref(), self.enforce_geofence) {
                Ok(validated) => validated,
                Err(reason) => {
                    return Ok(RedemptionDecision::denied(
                        reason,
                        false,
                        self.snapshot(&pass, month)?,
                    ));
                }
            };

        if let Err(reason) = engine::check_conditions(
            benefit,
            request.cart.as_ref(),
            request.context.as_ref(),
            today,
        ) {
            return Ok(RedemptionDecision::denied(
                reason,
                geo_validated,
                self.snapshot(&pass, month)?,
            ));
        }

        let outcome =
            self.store
                .try_redeem(&pass, &benefit.counter, benefit.max_per_month, month)?;

        match outcome {
            RedeemOutcome::Approved { .. } => Ok(RedemptionDecision::approved(
                geo_validated,
                self.snapshot(&pass, month)?,
            )),
            RedeemOutcome::Exhausted => Ok(RedemptionDecision::denied(
                DenialReason::LimitReached,
                geo_validated,
                self.snapshot(&pass, month)?,
            )),
        }
    }

    /// Read-only snapshot of every catalog counter for the pass.
    pub fn snapshot(&self, pass: &PassId, month: MonthStamp) -> Result<BalanceMap, StoreError> {
        let mut balances = BalanceMap::new();
        for (counter, max_per_month) in self.catalog.counters() {
            let remaining = self.store.remaining(pass, counter, max_per_month, month)?;
            balances.insert(counter.clone(), remaining.to_string());
        }
        Ok(balances)
    }
}

/// Error raised by the redemption service for system failures. Business
/// denials are decisions, not errors.
#[derive(Debug, thiserror::Error)]
pub enum RedemptionServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
