use crate::infra::{AppState, BadgeState};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use perkpass::issuance::{IssuanceError, IssuanceRequest};
use perkpass::redemption::{redemption_router, BalanceStore, RedemptionService};

pub(crate) fn with_pass_routes<S>(service: Arc<RedemptionService<S>>) -> axum::Router
where
    S: BalanceStore + 'static,
{
    redemption_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/issue-badge", axum::routing::post(issue_badge_endpoint))
}

pub(crate) async fn healthcheck(
    Extension(badge): Extension<BadgeState>,
) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "env": {
            "hasApiKey": badge.has_api_key,
            "hasTemplateId": badge.has_template_id,
        },
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn issue_badge_endpoint(
    Extension(badge): Extension<BadgeState>,
    Json(payload): Json<IssuanceRequest>,
) -> Response {
    let Some(issuer) = badge.issuer.as_ref() else {
        let body = json!({ "ok": false, "error": "Missing Badge API configuration" });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };

    match issuer.issue(&payload).await {
        Ok(record) => {
            tracing::info!(pass_id = %record.pass_id, "pass issued");
            let body = json!({ "ok": true, "data": record.raw });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err @ (IssuanceError::MissingField { .. } | IssuanceError::NotConfigured)) => {
            let body = json!({ "ok": false, "error": err.to_string() });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        Err(err) => {
            tracing::warn!(%err, "badge upsert failed");
            let body = json!({ "ok": false, "error": err.to_string() });
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryBalanceStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use perkpass::catalog::{collective_geofences, BenefitCatalog};
    use serde_json::Value;
    use tower::ServiceExt;

    fn unconfigured_badge_state() -> BadgeState {
        BadgeState {
            issuer: None,
            has_api_key: false,
            has_template_id: true,
        }
    }

    fn test_router() -> axum::Router {
        let service = Arc::new(RedemptionService::new(
            Arc::new(BenefitCatalog::collective()),
            Arc::new(collective_geofences()),
            Arc::new(InMemoryBalanceStore::default()),
            false,
        ));
        with_pass_routes(service).layer(Extension(unconfigured_badge_state()))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthcheck_reports_credential_presence() {
        let Json(body) = healthcheck(Extension(unconfigured_badge_state())).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["env"]["hasApiKey"], false);
        assert_eq!(body["env"]["hasTemplateId"], true);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn issue_badge_without_credentials_is_a_bad_request() {
        let request = IssuanceRequest {
            name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
            member_id: "P-001".to_string(),
        };

        let response =
            issue_badge_endpoint(Extension(unconfigured_badge_state()), Json(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Missing Badge API configuration");
    }

    #[tokio::test]
    async fn health_route_resolves_through_the_merged_router() {
        let response = test_router()
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["env"]["hasApiKey"], false);
    }

    #[tokio::test]
    async fn issue_badge_route_resolves_through_the_merged_router() {
        let payload = serde_json::to_vec(&serde_json::json!({
            "name": "Demo User",
            "email": "demo@example.com",
            "memberId": "P-001",
        }))
        .expect("serializes");
        let response = test_router()
            .oneshot(
                Request::post("/issue-badge")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing Badge API configuration");
    }

    #[tokio::test]
    async fn redeem_route_survives_the_route_merge() {
        let payload = serde_json::to_vec(&serde_json::json!({ "passId": "P-001" }))
            .expect("serializes");
        let response = test_router()
            .oneshot(
                Request::post("/redeem/TULUM/PERCENT_10")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["balances"]["tulum_remaining"], "0");
    }
}
