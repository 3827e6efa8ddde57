use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use super::amortization;
use super::bureau::{BureauError, RiskAssessmentClient};
use super::domain::{
    ClientId, ClientSummary, CreditEvaluation, EvaluationOutcome, FinancingTerms, InstallmentPlan,
    RiskAssessment, SessionId, VehicleId, VehicleSummary,
};
use super::ledger::{EvaluationFilter, EvaluationLedger, LedgerError, LedgerStats, NewEvaluation};
use super::policy::{decide, CreditDecision, DecisionPolicy};
use super::wizard::{CreditWizard, ValidationError, WizardError, WizardSnapshot};

/// Read-only lookup into the dealership's client records. The engine never
/// writes through this boundary.
pub trait ClientDirectory: Send + Sync {
    fn client(&self, id: &ClientId) -> Option<ClientSummary>;
}

/// Read-only lookup into the vehicle inventory.
pub trait VehicleDirectory: Send + Sync {
    fn vehicle(&self, id: &VehicleId) -> Option<VehicleSummary>;
}

const DEFAULT_ASSESSMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Session handle plus the current wizard view, returned by inbound calls.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub snapshot: WizardSnapshot,
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("risk assessment failed: {0}")]
    Assessment(#[from] BureauError),
    #[error("risk assessment timed out after {0:?}")]
    AssessmentTimeout(Duration),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("unknown evaluation session {0}")]
    SessionNotFound(SessionId),
    #[error("evaluation invariant violated: {0}")]
    Invariant(String),
}

impl From<ValidationError> for EvaluationError {
    fn from(value: ValidationError) -> Self {
        Self::Wizard(WizardError::Validation(value))
    }
}

/// Service composing the intake wizard, amortization table, risk bureau, and
/// evaluation ledger. One instance serves every concurrent session; sessions
/// live in a map keyed by id and each holds its own wizard.
pub struct CreditEvaluationService<C, V, B, L> {
    clients: Arc<C>,
    vehicles: Arc<V>,
    bureau: Arc<B>,
    ledger: Arc<L>,
    policy: DecisionPolicy,
    assessment_timeout: Duration,
    sessions: Mutex<HashMap<SessionId, CreditWizard>>,
    session_sequence: AtomicU64,
}

impl<C, V, B, L> CreditEvaluationService<C, V, B, L>
where
    C: ClientDirectory + 'static,
    V: VehicleDirectory + 'static,
    B: RiskAssessmentClient + 'static,
    L: EvaluationLedger + 'static,
{
    pub fn new(
        clients: Arc<C>,
        vehicles: Arc<V>,
        bureau: Arc<B>,
        ledger: Arc<L>,
        policy: DecisionPolicy,
    ) -> Self {
        Self::with_assessment_timeout(
            clients,
            vehicles,
            bureau,
            ledger,
            policy,
            DEFAULT_ASSESSMENT_TIMEOUT,
        )
    }

    pub fn with_assessment_timeout(
        clients: Arc<C>,
        vehicles: Arc<V>,
        bureau: Arc<B>,
        ledger: Arc<L>,
        policy: DecisionPolicy,
        assessment_timeout: Duration,
    ) -> Self {
        Self {
            clients,
            vehicles,
            bureau,
            ledger,
            policy,
            assessment_timeout,
            sessions: Mutex::new(HashMap::new()),
            session_sequence: AtomicU64::new(1),
        }
    }

    /// Open a session and apply the subject selection in one step. Both ids
    /// must resolve through the directories before the wizard advances.
    pub fn start_evaluation(
        &self,
        subject_id: ClientId,
        vehicle_id: VehicleId,
    ) -> Result<SessionView, EvaluationError> {
        let subject = self
            .clients
            .client(&subject_id)
            .ok_or_else(|| ValidationError::UnknownSubject(subject_id.clone()))?;
        let vehicle = self
            .vehicles
            .vehicle(&vehicle_id)
            .ok_or_else(|| ValidationError::UnknownVehicle(vehicle_id.clone()))?;

        let suggested = self.policy.suggested_down_payment(vehicle.price);
        let mut wizard = CreditWizard::new();
        wizard.select_subject(subject, vehicle, suggested)?;

        let session_id = self.next_session_id();
        let snapshot = wizard.snapshot();
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(session_id.clone(), wizard);

        info!(
            session = %session_id,
            subject = %subject_id,
            vehicle = %vehicle_id,
            "credit evaluation session opened"
        );
        Ok(SessionView {
            session_id,
            snapshot,
        })
    }

    /// Record the declared financial terms on an open session.
    pub fn set_financials(
        &self,
        session_id: &SessionId,
        monthly_income: Decimal,
        down_payment: Decimal,
        installments: InstallmentPlan,
    ) -> Result<SessionView, EvaluationError> {
        self.with_session(session_id, |wizard| {
            wizard.set_financials(monthly_income, down_payment, installments)
        })
    }

    /// Return the session to subject selection, dropping the draft.
    pub fn step_back(&self, session_id: &SessionId) -> Result<SessionView, EvaluationError> {
        self.with_session(session_id, |wizard| wizard.step_back())
    }

    /// Cancel the in-progress request. The session survives, idle at subject
    /// selection, and nothing reaches the ledger.
    pub fn cancel(&self, session_id: &SessionId) -> Result<SessionView, EvaluationError> {
        let view = self.with_session(session_id, |wizard| wizard.cancel())?;
        info!(session = %session_id, "credit evaluation cancelled");
        Ok(view)
    }

    /// Current view of a session without touching its state.
    pub fn session(&self, session_id: &SessionId) -> Result<SessionView, EvaluationError> {
        let sessions = self.sessions.lock().expect("session mutex poisoned");
        let wizard = sessions
            .get(session_id)
            .ok_or_else(|| EvaluationError::SessionNotFound(session_id.clone()))?;

        Ok(SessionView {
            session_id: session_id.clone(),
            snapshot: wizard.snapshot(),
        })
    }

    /// Run the submission pipeline: freeze the terms, query the bureau,
    /// price the installment, apply the approval rule, and append the result
    /// to the ledger.
    ///
    /// The session sits in `Assessing` for the duration, which refuses
    /// repeated submissions of the same request. The session lock is not
    /// held across the bureau call, so other sessions proceed while this one
    /// waits.
    pub async fn submit(
        &self,
        session_id: &SessionId,
    ) -> Result<CreditEvaluation, EvaluationError> {
        let terms = {
            let mut sessions = self.sessions.lock().expect("session mutex poisoned");
            let wizard = sessions
                .get_mut(session_id)
                .ok_or_else(|| EvaluationError::SessionNotFound(session_id.clone()))?;
            wizard.begin_assessment()?
        };

        let requested_at = Utc::now();
        let assessment = match tokio::time::timeout(
            self.assessment_timeout,
            self.bureau.assess(&terms.subject_id, terms.monthly_income),
        )
        .await
        {
            Ok(Ok(assessment)) => assessment,
            Ok(Err(err)) => {
                warn!(session = %session_id, error = %err, "risk assessment failed");
                self.reopen_financials(session_id);
                return Err(EvaluationError::Assessment(err));
            }
            Err(_) => {
                warn!(
                    session = %session_id,
                    timeout_ms = self.assessment_timeout.as_millis() as u64,
                    "risk assessment timed out"
                );
                self.reopen_financials(session_id);
                return Err(EvaluationError::AssessmentTimeout(self.assessment_timeout));
            }
        };

        if terms.monthly_income <= Decimal::ZERO {
            error!(session = %session_id, "non-positive income reached the decision rule");
            self.discard_session(session_id);
            return Err(EvaluationError::Invariant(
                "monthly income must be positive at decision time".to_string(),
            ));
        }

        let monthly_payment =
            amortization::payment_for_plan(terms.financed_amount(), terms.installments);
        let outcome = match decide(
            monthly_payment,
            terms.monthly_income,
            &assessment,
            &self.policy,
        ) {
            CreditDecision::Approved => EvaluationOutcome::Approved {
                approved_at: Utc::now(),
            },
            CreditDecision::Rejected { reason } => EvaluationOutcome::Rejected { reason },
        };

        let record = match self.ledger.append(new_evaluation(
            &terms,
            requested_at,
            monthly_payment,
            assessment,
            outcome,
        )) {
            Ok(record) => record,
            Err(err) => {
                warn!(session = %session_id, error = %err, "ledger append failed");
                self.reopen_financials(session_id);
                return Err(err.into());
            }
        };

        {
            let mut sessions = self.sessions.lock().expect("session mutex poisoned");
            if let Some(wizard) = sessions.get_mut(session_id) {
                wizard.resolve(record.clone())?;
                let _ = wizard.take_resolution();
            }
        }

        info!(
            evaluation = %record.id,
            subject = %record.subject_id,
            status = record.status().label(),
            "credit evaluation recorded"
        );
        Ok(record)
    }

    /// Ledger records matching the filter, oldest first.
    pub fn evaluations(
        &self,
        filter: &EvaluationFilter,
    ) -> Result<Vec<CreditEvaluation>, EvaluationError> {
        Ok(self.ledger.list(filter)?)
    }

    /// Aggregate counts for reporting surfaces.
    pub fn statistics(&self) -> Result<LedgerStats, EvaluationError> {
        Ok(self.ledger.stats()?)
    }

    fn with_session(
        &self,
        session_id: &SessionId,
        operation: impl FnOnce(&mut CreditWizard) -> Result<(), WizardError>,
    ) -> Result<SessionView, EvaluationError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let wizard = sessions
            .get_mut(session_id)
            .ok_or_else(|| EvaluationError::SessionNotFound(session_id.clone()))?;

        operation(wizard)?;
        Ok(SessionView {
            session_id: session_id.clone(),
            snapshot: wizard.snapshot(),
        })
    }

    // Failed submissions return the session to financial entry with the
    // entered terms intact.
    fn reopen_financials(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        if let Some(wizard) = sessions.get_mut(session_id) {
            let _ = wizard.fail_assessment();
        }
    }

    fn discard_session(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.remove(session_id);
    }

    fn next_session_id(&self) -> SessionId {
        let id = self.session_sequence.fetch_add(1, Ordering::Relaxed);
        SessionId(format!("sess-{id:06}"))
    }
}

fn new_evaluation(
    terms: &FinancingTerms,
    requested_at: DateTime<Utc>,
    monthly_payment: Decimal,
    risk_assessment: RiskAssessment,
    outcome: EvaluationOutcome,
) -> NewEvaluation {
    NewEvaluation {
        subject_id: terms.subject_id.clone(),
        subject_name: terms.subject_name.clone(),
        vehicle_id: terms.vehicle_id.clone(),
        requested_at,
        credit_amount: terms.credit_amount,
        down_payment: terms.down_payment,
        installments: terms.installments,
        interest_rate: terms.installments.monthly_rate_fraction(),
        monthly_payment,
        risk_assessment,
        outcome,
    }
}
