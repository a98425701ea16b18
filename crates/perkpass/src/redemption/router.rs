use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::catalog::{BenefitKey, VendorKey};
use crate::geo::GeoReading;

use super::domain::{CartSnapshot, DenialReason, RedemptionContext, RedemptionRequest};
use super::service::RedemptionService;
use super::store::BalanceStore;

/// Router builder exposing the redemption endpoint.
pub fn redemption_router<S>(service: Arc<RedemptionService<S>>) -> Router
where
    S: BalanceStore + 'static,
{
    Router::new()
        .route("/redeem/:vendor_key/:benefit_key", post(redeem_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RedeemBody {
    #[serde(default)]
    pub(crate) pass_id: Option<String>,
    #[serde(default)]
    pub(crate) geo: Option<GeoReading>,
    #[serde(default)]
    pub(crate) cart: Option<CartSnapshot>,
    #[serde(default)]
    pub(crate) context: Option<RedemptionContext>,
}

pub(crate) async fn redeem_handler<S>(
    State(service): State<Arc<RedemptionService<S>>>,
    Path((vendor_key, benefit_key)): Path<(String, String)>,
    axum::Json(body): axum::Json<RedeemBody>,
) -> Response
where
    S: BalanceStore + 'static,
{
    let request = RedemptionRequest {
        pass_id: body.pass_id.unwrap_or_default(),
        vendor: VendorKey(vendor_key),
        benefit: BenefitKey(benefit_key),
        geo: body.geo,
        cart: body.cart,
        context: body.context,
    };

    let today = Local::now().date_naive();
    let decision = match service.redeem(&request, today) {
        Ok(decision) => decision,
        Err(err) => {
            warn!(%err, "redemption failed");
            let payload = json!({ "ok": false, "error": "internal error" });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    };

    if decision.approved {
        info!(
            vendor = %request.vendor,
            benefit = %request.benefit,
            geo_validated = decision.geo_validated,
            "redemption approved"
        );
        let payload = json!({
            "ok": true,
            "vendorKey": request.vendor,
            "benefitKey": request.benefit,
            "passId": request.pass_id,
            "geoValidated": decision.geo_validated,
            "balances": decision.balances,
        });
        return (StatusCode::OK, axum::Json(payload)).into_response();
    }

    let reason = decision
        .reason
        .unwrap_or(DenialReason::UnknownBenefit);
    info!(
        vendor = %request.vendor,
        benefit = %request.benefit,
        reason = reason.code(),
        "redemption denied"
    );

    // A missing pass id is a malformed request; business denials are normal
    // outcomes and stay 200.
    let status = match reason {
        DenialReason::MissingPassId => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    let payload = json!({
        "ok": false,
        "reason": reason.code(),
        "geoValidated": decision.geo_validated,
        "balances": decision.balances,
    });
    (status, axum::Json(payload)).into_response()
}
