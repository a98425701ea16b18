use crate::cli::ServeArgs;
use crate::infra::{AppState, BadgeState, InMemoryBalanceStore};
use crate::routes::with_pass_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use perkpass::catalog::{collective_geofences, BenefitCatalog};
use perkpass::config::AppConfig;
use perkpass::error::AppError;
use perkpass::issuance::{HttpBadgeGateway, PassIssuer};
use perkpass::redemption::RedemptionService;
use perkpass::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = Arc::new(BenefitCatalog::collective());
    let store = Arc::new(InMemoryBalanceStore::default());
    let redemption_service = Arc::new(RedemptionService::new(
        catalog.clone(),
        Arc::new(collective_geofences()),
        store,
        config.geofence.enforce,
    ));

    let issuer = if config.badge.is_configured() {
        let gateway = HttpBadgeGateway::from_config(&config.badge)?;
        Some(Arc::new(PassIssuer::new(gateway, &config.badge, catalog)?))
    } else {
        warn!("badge credentials missing, pass issuance disabled");
        None
    };
    let badge_state = BadgeState {
        issuer,
        has_api_key: config.badge.api_key.is_some(),
        has_template_id: config.badge.template_id.is_some(),
    };

    let app = with_pass_routes(redemption_service)
        .layer(Extension(app_state))
        .layer(Extension(badge_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        enforce_geofence = config.geofence.enforce,
        "loyalty pass service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
