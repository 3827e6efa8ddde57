use crate::infra::{AppState, InMemoryClientDirectory, InMemoryVehicleDirectory};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use dealer_credit::workflows::financing::{
    financing_router, ClientDirectory, ClientSummary, CreditEvaluationService, EvaluationLedger,
    InstallmentPlan, RiskAssessmentClient, VehicleDirectory, VehicleSummary,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Reference data the intake front end needs before a session can open:
/// who can apply, what is on the lot, and which plans the rate table prices.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CatalogResponse {
    pub(crate) clients: Vec<ClientSummary>,
    pub(crate) vehicles: Vec<VehicleSummary>,
    pub(crate) installment_plans: Vec<InstallmentPlanEntry>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct InstallmentPlanEntry {
    pub(crate) months: u32,
    pub(crate) monthly_rate_percent: Decimal,
}

impl CatalogResponse {
    pub(crate) fn from_directories(
        clients: &InMemoryClientDirectory,
        vehicles: &InMemoryVehicleDirectory,
    ) -> Self {
        Self {
            clients: clients.entries().to_vec(),
            vehicles: vehicles.entries().to_vec(),
            installment_plans: InstallmentPlan::ALL
                .into_iter()
                .map(|plan| InstallmentPlanEntry {
                    months: plan.months(),
                    monthly_rate_percent: plan.monthly_rate_percent(),
                })
                .collect(),
        }
    }
}

pub(crate) fn with_financing_routes<C, V, B, L>(
    service: Arc<CreditEvaluationService<C, V, B, L>>,
) -> axum::Router
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    financing_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/financing/catalog",
            axum::routing::get(catalog_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
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

pub(crate) async fn catalog_endpoint(
    Extension(catalog): Extension<Arc<CatalogResponse>>,
) -> Json<CatalogResponse> {
    Json(catalog.as_ref().clone())
}
