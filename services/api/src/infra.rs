use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use perkpass::catalog::CounterName;
use perkpass::issuance::{HttpBadgeGateway, PassIssuer};
use perkpass::redemption::{BalanceStore, MonthStamp, PassId, RedeemOutcome, StoreError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Issuance wiring shared with the HTTP handlers. The issuer is absent when
/// the badge credentials are missing; the endpoints degrade instead of the
/// whole service refusing to start.
#[derive(Clone)]
pub(crate) struct BadgeState {
    pub(crate) issuer: Option<Arc<PassIssuer<HttpBadgeGateway>>>,
    pub(crate) has_api_key: bool,
    pub(crate) has_template_id: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct CounterState {
    remaining: u32,
    month: MonthStamp,
}

/// Process-local balance ledger. Counters lazily reset when a redemption
/// arrives in a later month than the stored stamp.
#[derive(Default)]
pub(crate) struct InMemoryBalanceStore {
    counters: Mutex<HashMap<(PassId, CounterName), CounterState>>,
}

impl BalanceStore for InMemoryBalanceStore {
    fn remaining(
        &self,
        pass: &PassId,
        counter: &CounterName,
        max_per_month: u32,
        month: MonthStamp,
    ) -> Result<u32, StoreError> {
        let guard = self.counters.lock().map_err(poisoned)?;
        Ok(match guard.get(&(pass.clone(), counter.clone())) {
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
        let mut guard = self.counters.lock().map_err(poisoned)?;
        let state = guard
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

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("balance ledger mutex poisoned".to_string())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
