use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    ClientId, ClientSummary, CreditEvaluation, EvaluationView, FinancingTerms, InstallmentPlan,
    UnsupportedInstallments, VehicleId, VehicleSummary,
};

/// User-correctable intake error. Every variant names the form field the
/// presentation layer should highlight.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("no client selected for the evaluation")]
    MissingSubject,
    #[error("no vehicle selected for the evaluation")]
    MissingVehicle,
    #[error("client {0} is not in the directory")]
    UnknownSubject(ClientId),
    #[error("vehicle {0} is not in the inventory")]
    UnknownVehicle(VehicleId),
    #[error("monthly income must be greater than zero")]
    NonPositiveIncome,
    #[error("down payment cannot be negative")]
    NegativeDownPayment,
    #[error("down payment {down_payment} must stay below the credit amount {credit_amount}")]
    DownPaymentTooLarge {
        down_payment: Decimal,
        credit_amount: Decimal,
    },
    #[error(transparent)]
    UnsupportedInstallments(#[from] UnsupportedInstallments),
}

impl ValidationError {
    pub const fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingSubject | ValidationError::UnknownSubject(_) => "subject_id",
            ValidationError::MissingVehicle | ValidationError::UnknownVehicle(_) => "vehicle_id",
            ValidationError::NonPositiveIncome => "monthly_income",
            ValidationError::NegativeDownPayment | ValidationError::DownPaymentTooLarge { .. } => {
                "down_payment"
            }
            ValidationError::UnsupportedInstallments(_) => "installment_count",
        }
    }
}

/// Fault raised by wizard operations.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot {action} while the session is {stage}")]
    InvalidTransition {
        stage: &'static str,
        action: &'static str,
    },
}

/// Where a session currently sits. Presentation renders this directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    SelectingSubject,
    EnteringFinancials,
    Assessing,
    Resolved,
}

impl WizardStage {
    pub const fn label(self) -> &'static str {
        match self {
            WizardStage::SelectingSubject => "selecting_subject",
            WizardStage::EnteringFinancials => "entering_financials",
            WizardStage::Assessing => "assessing",
            WizardStage::Resolved => "resolved",
        }
    }
}

/// Terms collected so far. Income stays unset until the subject declares it,
/// so a draft can never masquerade as a submittable request.
#[derive(Debug, Clone, PartialEq)]
struct DraftFinancials {
    subject_id: ClientId,
    subject_name: String,
    vehicle_id: VehicleId,
    credit_amount: Decimal,
    down_payment: Decimal,
    installments: InstallmentPlan,
    monthly_income: Option<Decimal>,
}

impl DraftFinancials {
    fn seeded(subject: ClientSummary, vehicle: VehicleSummary, down_payment: Decimal) -> Self {
        Self {
            subject_id: subject.id,
            subject_name: subject.full_name,
            vehicle_id: vehicle.id,
            credit_amount: vehicle.price,
            down_payment,
            installments: InstallmentPlan::Months12,
            monthly_income: None,
        }
    }

    fn from_terms(terms: FinancingTerms) -> Self {
        Self {
            subject_id: terms.subject_id,
            subject_name: terms.subject_name,
            vehicle_id: terms.vehicle_id,
            credit_amount: terms.credit_amount,
            down_payment: terms.down_payment,
            installments: terms.installments,
            monthly_income: Some(terms.monthly_income),
        }
    }

    /// Check completeness and coherence, freezing the draft into terms.
    fn freeze(&self) -> Result<FinancingTerms, ValidationError> {
        let monthly_income = self
            .monthly_income
            .ok_or(ValidationError::NonPositiveIncome)?;
        validate_amounts(monthly_income, self.down_payment, self.credit_amount)?;

        Ok(FinancingTerms {
            subject_id: self.subject_id.clone(),
            subject_name: self.subject_name.clone(),
            vehicle_id: self.vehicle_id.clone(),
            credit_amount: self.credit_amount,
            down_payment: self.down_payment,
            installments: self.installments,
            monthly_income,
        })
    }

    fn view(&self) -> DraftView {
        DraftView {
            subject_id: self.subject_id.clone(),
            subject_name: self.subject_name.clone(),
            vehicle_id: self.vehicle_id.clone(),
            credit_amount: self.credit_amount,
            down_payment: self.down_payment,
            installment_count: self.installments.months(),
            monthly_income: self.monthly_income,
        }
    }
}

fn validate_amounts(
    monthly_income: Decimal,
    down_payment: Decimal,
    credit_amount: Decimal,
) -> Result<(), ValidationError> {
    if monthly_income <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveIncome);
    }
    if down_payment < Decimal::ZERO {
        return Err(ValidationError::NegativeDownPayment);
    }
    if down_payment >= credit_amount {
        return Err(ValidationError::DownPaymentTooLarge {
            down_payment,
            credit_amount,
        });
    }
    Ok(())
}

#[derive(Debug)]
enum WizardState {
    SelectingSubject,
    EnteringFinancials { draft: DraftFinancials },
    Assessing { terms: FinancingTerms },
    Resolved { evaluation: CreditEvaluation },
}

/// Per-session intake state machine.
///
/// Legal transitions only; anything else returns `InvalidTransition` and
/// leaves the session untouched. A running assessment pins the session: the
/// only ways out of `Assessing` are `resolve` and `fail_assessment`, both
/// driven by the service that started the submission.
#[derive(Debug)]
pub struct CreditWizard {
    state: WizardState,
}

impl CreditWizard {
    pub fn new() -> Self {
        Self {
            state: WizardState::SelectingSubject,
        }
    }

    pub fn stage(&self) -> WizardStage {
        match &self.state {
            WizardState::SelectingSubject => WizardStage::SelectingSubject,
            WizardState::EnteringFinancials { .. } => WizardStage::EnteringFinancials,
            WizardState::Assessing { .. } => WizardStage::Assessing,
            WizardState::Resolved { .. } => WizardStage::Resolved,
        }
    }

    /// Move into financial entry, seeding amounts from the selected vehicle:
    /// the credit amount starts at the vehicle price and the down payment at
    /// the policy-suggested fraction of it.
    pub fn select_subject(
        &mut self,
        subject: ClientSummary,
        vehicle: VehicleSummary,
        suggested_down_payment: Decimal,
    ) -> Result<(), WizardError> {
        if !matches!(self.state, WizardState::SelectingSubject) {
            return Err(self.invalid("select a subject"));
        }

        self.state = WizardState::EnteringFinancials {
            draft: DraftFinancials::seeded(subject, vehicle, suggested_down_payment),
        };
        Ok(())
    }

    /// Record declared income, down payment, and term. Each field is checked
    /// before anything is stored, so a rejected call leaves the draft as it
    /// was.
    pub fn set_financials(
        &mut self,
        monthly_income: Decimal,
        down_payment: Decimal,
        installments: InstallmentPlan,
    ) -> Result<(), WizardError> {
        let stage = self.stage().label();
        let draft = match &mut self.state {
            WizardState::EnteringFinancials { draft } => draft,
            _ => {
                return Err(WizardError::InvalidTransition {
                    stage,
                    action: "enter financial terms",
                })
            }
        };

        validate_amounts(monthly_income, down_payment, draft.credit_amount)?;

        draft.monthly_income = Some(monthly_income);
        draft.down_payment = down_payment;
        draft.installments = installments;
        Ok(())
    }

    /// Freeze the draft and enter `Assessing`, returning the terms the
    /// pipeline should evaluate. While the session stays in `Assessing`,
    /// repeated submissions are refused.
    pub fn begin_assessment(&mut self) -> Result<FinancingTerms, WizardError> {
        let terms = match &self.state {
            WizardState::EnteringFinancials { draft } => draft.freeze()?,
            _ => return Err(self.invalid("submit for assessment")),
        };

        self.state = WizardState::Assessing {
            terms: terms.clone(),
        };
        Ok(terms)
    }

    /// Attach the recorded evaluation, completing the submission.
    pub fn resolve(&mut self, evaluation: CreditEvaluation) -> Result<(), WizardError> {
        if !matches!(self.state, WizardState::Assessing { .. }) {
            return Err(self.invalid("record a resolution"));
        }

        self.state = WizardState::Resolved { evaluation };
        Ok(())
    }

    /// Reopen financial entry after an assessment failure. The terms the
    /// subject already entered survive, so the operator can resubmit without
    /// retyping them.
    pub fn fail_assessment(&mut self) -> Result<(), WizardError> {
        if !matches!(self.state, WizardState::Assessing { .. }) {
            return Err(self.invalid("abort an assessment"));
        }

        let state = std::mem::replace(&mut self.state, WizardState::SelectingSubject);
        if let WizardState::Assessing { terms } = state {
            self.state = WizardState::EnteringFinancials {
                draft: DraftFinancials::from_terms(terms),
            };
        }
        Ok(())
    }

    /// Return to subject selection, dropping the current draft.
    pub fn step_back(&mut self) -> Result<(), WizardError> {
        if !matches!(self.state, WizardState::EnteringFinancials { .. }) {
            return Err(self.invalid("step back"));
        }

        self.state = WizardState::SelectingSubject;
        Ok(())
    }

    /// Discard the in-progress request. Nothing reaches the ledger, and the
    /// session idles back at subject selection. Refused mid-assessment.
    pub fn cancel(&mut self) -> Result<(), WizardError> {
        if matches!(self.state, WizardState::Assessing { .. }) {
            return Err(self.invalid("cancel the request"));
        }

        self.state = WizardState::SelectingSubject;
        Ok(())
    }

    /// Hand back the resolution and reset for the next evaluation. Returns
    /// `None` unless the session is `Resolved`.
    pub fn take_resolution(&mut self) -> Option<CreditEvaluation> {
        if !matches!(self.state, WizardState::Resolved { .. }) {
            return None;
        }

        match std::mem::replace(&mut self.state, WizardState::SelectingSubject) {
            WizardState::Resolved { evaluation } => Some(evaluation),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let (draft, evaluation) = match &self.state {
            WizardState::SelectingSubject => (None, None),
            WizardState::EnteringFinancials { draft } => (Some(draft.view()), None),
            WizardState::Assessing { terms } => (
                Some(DraftFinancials::from_terms(terms.clone()).view()),
                None,
            ),
            WizardState::Resolved { evaluation } => (None, Some(evaluation.status_view())),
        };

        WizardSnapshot {
            stage: self.stage(),
            draft,
            evaluation,
        }
    }

    fn invalid(&self, action: &'static str) -> WizardError {
        WizardError::InvalidTransition {
            stage: self.stage().label(),
            action,
        }
    }
}

impl Default for CreditWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable projection of the draft for session views.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub subject_id: ClientId,
    pub subject_name: String,
    pub vehicle_id: VehicleId,
    pub credit_amount: Decimal,
    pub down_payment: Decimal,
    pub installment_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<Decimal>,
}

/// Observer view of a session: the stage plus whatever that stage exposes.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub stage: WizardStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationView>,
}
