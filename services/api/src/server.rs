use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryClientDirectory, InMemoryVehicleDirectory};
use crate::routes::{with_financing_routes, CatalogResponse};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use dealer_credit::config::AppConfig;
use dealer_credit::error::AppError;
use dealer_credit::telemetry;
use dealer_credit::workflows::financing::{CreditEvaluationService, MemoryLedger, SimulatedBureau};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let clients = Arc::new(InMemoryClientDirectory::seeded());
    let vehicles = Arc::new(InMemoryVehicleDirectory::seeded());
    let catalog = Arc::new(CatalogResponse::from_directories(&clients, &vehicles));
    let bureau = Arc::new(SimulatedBureau::new(config.engine.bureau_latency));
    let ledger = Arc::new(MemoryLedger::default());
    let service = Arc::new(CreditEvaluationService::with_assessment_timeout(
        clients,
        vehicles,
        bureau,
        ledger,
        config.engine.decision_policy(),
        config.engine.assessment_timeout,
    ));

    let app = with_financing_routes(service)
        .layer(Extension(app_state))
        .layer(Extension(catalog))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "credit evaluation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
