//! End-to-end scenarios for the redemption and issuance flows, driven
//! through the public service facades the API binary wires together.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use perkpass::catalog::{collective_geofences, BenefitCatalog, BenefitKey, CounterName, VendorKey};
    use perkpass::redemption::{
        BalanceStore, MonthStamp, PassId, RedeemOutcome, RedemptionRequest, RedemptionService,
        StoreError,
    };

    #[derive(Default)]
    pub struct MemoryStore {
        states: Mutex<HashMap<(PassId, CounterName), (u32, MonthStamp)>>,
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
                Some((remaining, stamp)) if *stamp == month => *remaining,
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
                .or_insert((max_per_month, month));
            if state.1 != month {
                *state = (max_per_month, month);
            }
            if state.0 == 0 {
                return Ok(RedeemOutcome::Exhausted);
            }
            state.0 -= 1;
            Ok(RedeemOutcome::Approved { remaining: state.0 })
        }
    }

    pub fn service(enforce: bool) -> RedemptionService<MemoryStore> {
        RedemptionService::new(
            Arc::new(BenefitCatalog::collective()),
            Arc::new(collective_geofences()),
            Arc::new(MemoryStore::default()),
            enforce,
        )
    }

    pub fn request(vendor: &str, benefit: &str, pass_id: &str) -> RedemptionRequest {
        RedemptionRequest {
            pass_id: pass_id.to_string(),
            vendor: VendorKey::new(vendor),
            benefit: BenefitKey::new(benefit),
            geo: None,
            cart: None,
            context: None,
        }
    }
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use perkpass::catalog::{BenefitCatalog, CounterName};
use perkpass::config::BadgeConfig;
use perkpass::geo::GeoReading;
use perkpass::issuance::{BadgeGateway, IssuanceError, IssuanceRequest, PassIssuer};
use serde_json::{json, Value};

use common::{request, service};

const SONOMA_LAT: f64 = 29.817091641171505;
const SONOMA_LNG: f64 = -95.4221111615325;

fn a_friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 26).expect("a friday")
}

#[test]
fn scenario_a_confident_sonoma_redemption_approves() {
    let service = service(true);
    let mut request = request("SONOMA", "PERCENT_10", "P-001");
    // ~3 m east of the storefront with a 2 m fix.
    request.geo = Some(GeoReading {
        lat: SONOMA_LAT,
        lng: SONOMA_LNG + 3.0 / 96_486.0,
        accuracy: 2.0,
    });

    let decision = service.redeem(&request, a_friday()).expect("decision");
    assert!(decision.approved);
    assert!(decision.geo_validated);
    assert_eq!(
        decision.balances.get(&CounterName::new("sonoma_remaining")),
        Some(&"0".to_string())
    );
}

#[test]
fn scenario_b_distant_reading_is_denied_with_balances_intact() {
    let service = service(true);
    let mut request = request("SONOMA", "PERCENT_10", "P-001");
    request.geo = Some(GeoReading {
        lat: SONOMA_LAT + 50.0 / 111_194.9,
        lng: SONOMA_LNG,
        accuracy: 5.0,
    });

    let decision = service.redeem(&request, a_friday()).expect("decision");
    assert!(!decision.approved);
    assert_eq!(
        decision.reason.as_ref().map(|reason| reason.code()),
        Some("OUT_OF_GEOFENCE")
    );
    assert_eq!(
        decision.balances.get(&CounterName::new("sonoma_remaining")),
        Some(&"1".to_string())
    );
}

#[test]
fn scenario_c_friday_workshop_on_a_thursday_is_denied() {
    let service = service(false);
    let thursday = NaiveDate::from_ymd_opt(2025, 9, 25).expect("a thursday");

    let decision = service
        .redeem(&request("KIDS_CREATE", "FRIDAY_WORKSHOP", "P-001"), thursday)
        .expect("decision");
    assert!(!decision.approved);
    assert_eq!(
        decision.reason.as_ref().map(|reason| reason.code()),
        Some("CONDITION_NOT_MET")
    );
}

#[derive(Default)]
struct CountingGateway {
    calls: Mutex<u32>,
}

#[async_trait]
impl BadgeGateway for CountingGateway {
    async fn upsert_pass(&self, _payload: Value) -> Result<Value, IssuanceError> {
        *self.calls.lock().expect("mutex poisoned") += 1;
        Ok(json!({ "pass": { "id": "P-001" } }))
    }
}

#[tokio::test]
async fn scenario_d_missing_email_never_reaches_the_badge_api() {
    let gateway = Arc::new(CountingGateway::default());
    let config = BadgeConfig {
        api_key: Some("key".to_string()),
        template_id: Some("tmpl".to_string()),
        endpoint: BadgeConfig::DEFAULT_ENDPOINT.to_string(),
        timeout: Duration::from_secs(5),
    };
    let issuer = PassIssuer::new(
        gateway.clone(),
        &config,
        Arc::new(BenefitCatalog::collective()),
    )
    .expect("configured issuer");

    let request = IssuanceRequest {
        name: "Demo User".to_string(),
        email: String::new(),
        member_id: "P-001".to_string(),
    };
    match issuer.issue(&request).await {
        Err(IssuanceError::MissingField { field }) => assert_eq!(field, "email"),
        other => panic!("expected missing field error, got {other:?}"),
    }
    assert_eq!(*gateway.calls.lock().expect("mutex poisoned"), 0);
}
