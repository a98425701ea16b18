use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::catalog::{collective_geofences, BenefitCatalog, BenefitKey, CounterName, VendorKey};
use crate::geo::{GeoReading, GeofenceSet};
use crate::redemption::domain::{MonthStamp, PassId, RedemptionRequest};
use crate::redemption::service::RedemptionService;
use crate::redemption::store::{BalanceStore, RedeemOutcome, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CounterState {
    pub(super) remaining: u32,
    pub(super) month: MonthStamp,
}

/// Mutex-backed store mirroring what the API binary wires in production.
#[derive(Default)]
pub(super) struct MemoryStore {
    states: Mutex<HashMap<(PassId, CounterName), CounterState>>,
}

impl MemoryStore {
    pub(super) fn redemption_count(&self) -> usize {
        self.states.lock().expect("store mutex poisoned").len()
    }
}

impl BalanceStore for MemoryStore {
    fn remaining(
        &self,
        pass: &PassId,
        counter: &CounterName,
        max_per_month: u32,
        month: MonthStamp,
    ) -> Result<u32, StoreError> {
        let states = self.states.lock().expect("store mutex poisoned");
        Ok(match states.get(&(pass.clone(), counter.clone())) {
            Some(state) if state.month == month => state.remaining,
            _ => max_per_month,
        })
    }

    fn try_redeem(
        &self,
        pass: &PassId,
        counter: &CounterName,
        max_per_month: u32,
        month: MonthStamp,
    ) -> Result<RedeemOutcome, StoreError> {
        let mut states = self.states.lock().expect("store mutex poisoned");
        let state = states
            .entry((pass.clone(), counter.clone()))
            .or_insert(CounterState {
                remaining: max_per_month,
                month,
            });
        if state.month != month {
            state.remaining = max_per_month;
            state.month = month;
        }
        if state.remaining == 0 {
            return Ok(RedeemOutcome::Exhausted);
        }
        state.remaining -= 1;
        Ok(RedeemOutcome::Approved {
            remaining: state.remaining,
        })
    }
}

/// Store stub that fails every call, for surfacing system errors.
pub(super) struct UnavailableStore;

impl BalanceStore for UnavailableStore {
    fn remaining(
        &self,
        _pass: &PassId,
        _counter: &CounterName,
        _max_per_month: u32,
        _month: MonthStamp,
    ) -> Result<u32, StoreError> {
        Err(StoreError::Unavailable("stub".to_string()))
    }

    fn try_redeem(
        &self,
        _pass: &PassId,
        _counter: &CounterName,
        _max_per_month: u32,
        _month: MonthStamp,
    ) -> Result<RedeemOutcome, StoreError> {
        Err(StoreError::Unavailable("stub".to_string()))
    }
}

pub(super) fn service(
    enforce: bool,
) -> (Arc<RedemptionService<MemoryStore>>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = Arc::new(RedemptionService::new(
        Arc::new(BenefitCatalog::collective()),
        Arc::new(collective_geofences()),
        store.clone(),
        enforce,
    ));
    (service, store)
}

pub(super) fn unavailable_service() -> Arc<RedemptionService<UnavailableStore>> {
    Arc::new(RedemptionService::new(
        Arc::new(BenefitCatalog::collective()),
        Arc::new(collective_geofences()),
        Arc::new(UnavailableStore),
        false,
    ))
}

pub(super) fn request(vendor: &str, benefit: &str, pass_id: &str) -> RedemptionRequest {
    RedemptionRequest {
        pass_id: pass_id.to_string(),
        vendor: VendorKey::new(vendor),
        benefit: BenefitKey::new(benefit),
        geo: None,
        cart: None,
        context: None,
    }
}

/// Reading a few meters from the Sonoma storefront with a tight fix.
pub(super) fn at_sonoma() -> GeoReading {
    GeoReading {
        lat: 29.817110,
        lng: -95.422111,
        accuracy: 2.0,
    }
}

/// Reading roughly 50 m north of Sonoma.
pub(super) fn near_but_outside_sonoma() -> GeoReading {
    GeoReading {
        lat: 29.817091641171505 + 50.0 / 111_194.9,
        lng: -95.4221111615325,
        accuracy: 5.0,
    }
}

pub(super) fn a_friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 26).expect("a friday")
}

pub(super) fn a_thursday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 25).expect("a thursday")
}

pub(super) fn empty_fences() -> GeofenceSet {
    GeofenceSet::default()
}
