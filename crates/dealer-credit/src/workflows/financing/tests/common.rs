use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::workflows::financing::bureau::{BureauError, RiskAssessmentClient};
use crate::workflows::financing::domain::{
    ClientId, ClientSummary, CreditEvaluation, EvaluationId, EvaluationOutcome, InstallmentPlan,
    RiskAssessment, SessionId, VehicleId, VehicleSummary,
};
use crate::workflows::financing::ledger::{EvaluationLedger, MemoryLedger};
use crate::workflows::financing::policy::{DecisionPolicy, REJECTION_REASON};
use crate::workflows::financing::service::{
    ClientDirectory, CreditEvaluationService, VehicleDirectory,
};

pub(super) fn decision_policy() -> DecisionPolicy {
    DecisionPolicy::default()
}

pub(super) fn subject() -> ClientSummary {
    ClientSummary {
        id: ClientId("C-1001".to_string()),
        full_name: "Marta Ibáñez".to_string(),
    }
}

pub(super) fn vehicle() -> VehicleSummary {
    VehicleSummary {
        id: VehicleId("V-2001".to_string()),
        label: "2023 Toyota Hilux SRV".to_string(),
        price: dec!(68_000_000),
    }
}

pub(super) struct StaticClients {
    clients: HashMap<String, ClientSummary>,
}

impl StaticClients {
    pub(super) fn seeded() -> Self {
        let mut clients = HashMap::new();
        for (id, full_name) in [
            ("C-1001", "Marta Ibáñez"),
            ("C-1002", "Julián Restrepo"),
            ("C-1003", "Carolina Vélez"),
        ] {
            clients.insert(
                id.to_string(),
                ClientSummary {
                    id: ClientId(id.to_string()),
                    full_name: full_name.to_string(),
                },
            );
        }
        Self { clients }
    }
}

impl ClientDirectory for StaticClients {
    fn client(&self, id: &ClientId) -> Option<ClientSummary> {
        self.clients.get(id.0.as_str()).cloned()
    }
}

pub(super) struct StaticVehicles {
    vehicles: HashMap<String, VehicleSummary>,
}

impl StaticVehicles {
    pub(super) fn seeded() -> Self {
        let mut vehicles = HashMap::new();
        for (id, label, price) in [
            ("V-2001", "2023 Toyota Hilux SRV", dec!(68_000_000)),
            ("V-2004", "2022 Renault Duster Zen", dec!(41_900_000)),
        ] {
            vehicles.insert(
                id.to_string(),
                VehicleSummary {
                    id: VehicleId(id.to_string()),
                    label: label.to_string(),
                    price,
                },
            );
        }
        Self { vehicles }
    }
}

impl VehicleDirectory for StaticVehicles {
    fn vehicle(&self, id: &VehicleId) -> Option<VehicleSummary> {
        self.vehicles.get(id.0.as_str()).cloned()
    }
}

/// Bureau double that answers instantly with a fixed score.
pub(super) struct StubBureau {
    score: u16,
}

impl StubBureau {
    pub(super) fn scoring(score: u16) -> Self {
        Self { score }
    }
}

#[async_trait]
impl RiskAssessmentClient for StubBureau {
    async fn assess(
        &self,
        _subject_id: &ClientId,
        monthly_income: Decimal,
    ) -> Result<RiskAssessment, BureauError> {
        Ok(RiskAssessment::from_score(self.score, monthly_income))
    }
}

pub(super) struct FailingBureau;

#[async_trait]
impl RiskAssessmentClient for FailingBureau {
    async fn assess(
        &self,
        _subject_id: &ClientId,
        _monthly_income: Decimal,
    ) -> Result<RiskAssessment, BureauError> {
        Err(BureauError::Transport(
            "bureau endpoint unreachable".to_string(),
        ))
    }
}

pub(super) struct SlowBureau {
    pub(super) delay: Duration,
    pub(super) score: u16,
}

#[async_trait]
impl RiskAssessmentClient for SlowBureau {
    async fn assess(
        &self,
        _subject_id: &ClientId,
        monthly_income: Decimal,
    ) -> Result<RiskAssessment, BureauError> {
        tokio::time::sleep(self.delay).await;
        Ok(RiskAssessment::from_score(self.score, monthly_income))
    }
}

pub(super) type TestService<B> =
    CreditEvaluationService<StaticClients, StaticVehicles, B, MemoryLedger>;

pub(super) fn build_service<B>(bureau: B) -> (Arc<TestService<B>>, Arc<MemoryLedger>)
where
    B: RiskAssessmentClient + 'static,
{
    let ledger = Arc::new(MemoryLedger::default());
    let service = Arc::new(CreditEvaluationService::new(
        Arc::new(StaticClients::seeded()),
        Arc::new(StaticVehicles::seeded()),
        Arc::new(bureau),
        ledger.clone(),
        decision_policy(),
    ));
    (service, ledger)
}

/// Service wired to a bureau whose score clears the policy floor.
pub(super) fn approving_service() -> (Arc<TestService<StubBureau>>, Arc<MemoryLedger>) {
    build_service(StubBureau::scoring(750))
}

pub(super) fn opened_session<B, L>(
    service: &CreditEvaluationService<StaticClients, StaticVehicles, B, L>,
) -> SessionId
where
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    service
        .start_evaluation(
            ClientId("C-1001".to_string()),
            VehicleId("V-2001".to_string()),
        )
        .expect("session opens")
        .session_id
}

pub(super) fn recorded_evaluation(approved: bool) -> CreditEvaluation {
    let outcome = if approved {
        EvaluationOutcome::Approved {
            approved_at: Utc::now(),
        }
    } else {
        EvaluationOutcome::Rejected {
            reason: REJECTION_REASON.to_string(),
        }
    };

    let score = if approved { 750 } else { 450 };
    CreditEvaluation {
        id: EvaluationId("eval-000001".to_string()),
        subject_id: ClientId("C-1001".to_string()),
        subject_name: "Marta Ibáñez".to_string(),
        vehicle_id: VehicleId("V-2001".to_string()),
        requested_at: Utc::now(),
        credit_amount: dec!(68_000_000),
        down_payment: dec!(17_000_000),
        installments: InstallmentPlan::Months36,
        interest_rate: dec!(0.012),
        monthly_payment: dec!(1_752_983),
        risk_assessment: RiskAssessment::from_score(score, dec!(8_000_000)),
        outcome,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn json_decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .expect("decimal parses")
}
