use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use super::bureau::RiskAssessmentClient;
use super::domain::{
    ClientId, CreditEvaluation, EvaluationOutcome, InstallmentPlan, SessionId, VehicleId,
};
use super::ledger::{EvaluationFilter, EvaluationLedger};
use super::service::{
    ClientDirectory, CreditEvaluationService, EvaluationError, VehicleDirectory,
};
use super::wizard::{ValidationError, WizardError};

/// Router builder exposing the financing workflow over HTTP.
pub fn financing_router<C, V, B, L>(service: Arc<CreditEvaluationService<C, V, B, L>>) -> Router
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    Router::new()
        .route(
            "/api/v1/financing/evaluations",
            post(start_handler::<C, V, B, L>).get(list_handler::<C, V, B, L>),
        )
        .route(
            "/api/v1/financing/evaluations/stats",
            get(stats_handler::<C, V, B, L>),
        )
        .route(
            "/api/v1/financing/evaluations/export",
            get(export_handler::<C, V, B, L>),
        )
        .route(
            "/api/v1/financing/sessions/:session_id",
            get(session_handler::<C, V, B, L>).delete(cancel_handler::<C, V, B, L>),
        )
        .route(
            "/api/v1/financing/sessions/:session_id/financials",
            put(financials_handler::<C, V, B, L>),
        )
        .route(
            "/api/v1/financing/sessions/:session_id/back",
            post(back_handler::<C, V, B, L>),
        )
        .route(
            "/api/v1/financing/sessions/:session_id/submit",
            post(submit_handler::<C, V, B, L>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartEvaluationRequest {
    #[serde(default)]
    pub(crate) subject_id: Option<String>,
    #[serde(default)]
    pub(crate) vehicle_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FinancialsRequest {
    pub(crate) monthly_income: Decimal,
    pub(crate) down_payment: Decimal,
    pub(crate) installment_count: u32,
}

pub(crate) async fn start_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    axum::Json(payload): axum::Json<StartEvaluationRequest>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    let subject_id = match sanitized_id(payload.subject_id) {
        Some(id) => ClientId(id),
        None => return error_response(ValidationError::MissingSubject.into()),
    };
    let vehicle_id = match sanitized_id(payload.vehicle_id) {
        Some(id) => VehicleId(id),
        None => return error_response(ValidationError::MissingVehicle.into()),
    };

    match service.start_evaluation(subject_id, vehicle_id) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn financials_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    Path(session_id): Path<String>,
    axum::Json(payload): axum::Json<FinancialsRequest>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    let installments = match InstallmentPlan::try_from(payload.installment_count) {
        Ok(plan) => plan,
        Err(err) => return error_response(ValidationError::from(err).into()),
    };

    match service.set_financials(
        &SessionId(session_id),
        payload.monthly_income,
        payload.down_payment,
        installments,
    ) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    match service.submit(&SessionId(session_id)).await {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn back_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    match service.step_back(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cancel_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    match service.cancel(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn session_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    match service.session(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    Query(filter): Query<EvaluationFilter>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    match service.evaluations(&filter) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    match service.statistics() {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<C, V, B, L>(
    State(service): State<Arc<CreditEvaluationService<C, V, B, L>>>,
    Query(filter): Query<EvaluationFilter>,
) -> Response
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    let records = match service.evaluations(&filter) {
        Ok(records) => records,
        Err(err) => return error_response(err),
    };

    match render_csv(&records) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"evaluations.csv\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn sanitized_id(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn error_response(err: EvaluationError) -> Response {
    match err {
        EvaluationError::Wizard(WizardError::Validation(validation)) => {
            let payload = json!({
                "error": validation.to_string(),
                "field": validation.field(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        EvaluationError::Wizard(transition @ WizardError::InvalidTransition { .. }) => {
            let payload = json!({
                "error": transition.to_string(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        EvaluationError::SessionNotFound(session_id) => {
            let payload = json!({
                "error": format!("unknown evaluation session {session_id}"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        err @ EvaluationError::Assessment(_) => {
            let payload = json!({
                "error": err.to_string(),
                "kind": "assessment_failed",
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        err @ EvaluationError::AssessmentTimeout(_) => {
            let payload = json!({
                "error": err.to_string(),
                "kind": "assessment_failed",
            });
            (StatusCode::GATEWAY_TIMEOUT, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn render_csv(records: &[CreditEvaluation]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "subject_id",
        "subject",
        "vehicle_id",
        "requested_at",
        "credit_amount",
        "down_payment",
        "installment_count",
        "interest_rate",
        "monthly_payment",
        "score",
        "risk_level",
        "status",
        "approved_at",
        "rejection_reason",
    ])?;

    for record in records {
        let (approved_at, rejection_reason) = match &record.outcome {
            EvaluationOutcome::Approved { approved_at } => {
                (approved_at.to_rfc3339(), String::new())
            }
            EvaluationOutcome::Rejected { reason } => (String::new(), reason.clone()),
        };

        writer.write_record([
            record.id.0.clone(),
            record.subject_id.0.clone(),
            record.subject_name.clone(),
            record.vehicle_id.0.clone(),
            record.requested_at.to_rfc3339(),
            record.credit_amount.to_string(),
            record.down_payment.to_string(),
            record.installments.months().to_string(),
            record.interest_rate.to_string(),
            record.monthly_payment.to_string(),
            record.risk_assessment.score.to_string(),
            record.risk_assessment.risk_level.label().to_string(),
            record.status().label().to_string(),
            approved_at,
            rejection_reason,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
