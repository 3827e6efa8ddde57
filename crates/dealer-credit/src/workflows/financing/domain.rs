use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for credit subjects (dealership clients).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

/// Identifier wrapper for vehicles in the sales inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

/// Identifier assigned by the ledger when an evaluation is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

/// Identifier for one intake wizard session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only projection of a client record for intake and audit display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: ClientId,
    pub full_name: String,
}

/// Read-only projection of an inventory vehicle, price included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub id: VehicleId,
    pub label: String,
    pub price: Decimal,
}

/// Raised when an installment count outside the supported table is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported installment count {0}: expected one of 12, 24, 36, 48 or 60")]
pub struct UnsupportedInstallments(pub u32);

/// Supported repayment terms. Each term carries its own monthly rate, and
/// any other count is rejected during intake instead of falling back to a
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum InstallmentPlan {
    Months12,
    Months24,
    Months36,
    Months48,
    Months60,
}

impl InstallmentPlan {
    pub const ALL: [InstallmentPlan; 5] = [
        InstallmentPlan::Months12,
        InstallmentPlan::Months24,
        InstallmentPlan::Months36,
        InstallmentPlan::Months48,
        InstallmentPlan::Months60,
    ];

    pub const fn months(self) -> u32 {
        match self {
            InstallmentPlan::Months12 => 12,
            InstallmentPlan::Months24 => 24,
            InstallmentPlan::Months36 => 36,
            InstallmentPlan::Months48 => 48,
            InstallmentPlan::Months60 => 60,
        }
    }

    /// Monthly interest as a percentage: 1.2 means 1.2% per month.
    pub fn monthly_rate_percent(self) -> Decimal {
        match self {
            InstallmentPlan::Months12 => dec!(1.0),
            InstallmentPlan::Months24 => dec!(1.1),
            InstallmentPlan::Months36 => dec!(1.2),
            InstallmentPlan::Months48 => dec!(1.3),
            InstallmentPlan::Months60 => dec!(1.4),
        }
    }

    /// Monthly interest as a fraction: 0.012 for the 36 month plan. This is
    /// the form stored on ledger records.
    pub fn monthly_rate_fraction(self) -> Decimal {
        self.monthly_rate_percent() / dec!(100)
    }
}

impl TryFrom<u32> for InstallmentPlan {
    type Error = UnsupportedInstallments;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            12 => Ok(InstallmentPlan::Months12),
            24 => Ok(InstallmentPlan::Months24),
            36 => Ok(InstallmentPlan::Months36),
            48 => Ok(InstallmentPlan::Months48),
            60 => Ok(InstallmentPlan::Months60),
            other => Err(UnsupportedInstallments(other)),
        }
    }
}

impl From<InstallmentPlan> for u32 {
    fn from(plan: InstallmentPlan) -> Self {
        plan.months()
    }
}

/// Coarse classification derived from the bureau score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a raw bureau score: 700 and above is low risk, 600 to 699
    /// medium, everything below 600 high.
    pub const fn from_score(score: u16) -> Self {
        if score >= 700 {
            RiskLevel::Low
        } else if score >= 600 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Bureau response for a single evaluation. Immutable once produced; the
/// ledger stores it verbatim for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u16,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub has_debts: bool,
    /// Income the subject declared at intake, echoed back by the bureau.
    pub monthly_income: Decimal,
}

impl RiskAssessment {
    /// Derive the level-dependent fields from a raw bureau score.
    pub fn from_score(score: u16, monthly_income: Decimal) -> Self {
        let risk_level = RiskLevel::from_score(score);
        let recommendations = match risk_level {
            RiskLevel::Low => vec![
                "eligible for preferential financing rates".to_string(),
                "a shorter term would reduce total interest paid".to_string(),
            ],
            RiskLevel::Medium => vec![
                "a larger down payment would improve the offer".to_string(),
                "review outstanding obligations before signing".to_string(),
            ],
            RiskLevel::High => vec![
                "settle outstanding debts before reapplying".to_string(),
                "consider a guarantor or a larger down payment".to_string(),
            ],
        };

        Self {
            score,
            risk_level,
            recommendations,
            has_debts: score < 600,
            monthly_income,
        }
    }
}

/// Validated, frozen terms handed to the evaluation pipeline at submission.
/// The wizard guarantees the amounts are coherent before one of these exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancingTerms {
    pub subject_id: ClientId,
    pub subject_name: String,
    pub vehicle_id: VehicleId,
    pub credit_amount: Decimal,
    pub down_payment: Decimal,
    pub installments: InstallmentPlan,
    pub monthly_income: Decimal,
}

impl FinancingTerms {
    /// Principal actually amortized: credit amount minus the down payment.
    pub fn financed_amount(&self) -> Decimal {
        self.credit_amount - self.down_payment
    }
}

/// Terminal state of a recorded evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Approved,
    Rejected,
}

impl EvaluationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EvaluationStatus::Approved => "approved",
            EvaluationStatus::Rejected => "rejected",
        }
    }
}

/// Decision attached to a ledger record. Approval carries the decision
/// timestamp and rejection carries the reason; neither field exists on the
/// other variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Approved { approved_at: DateTime<Utc> },
    Rejected { reason: String },
}

impl EvaluationOutcome {
    pub const fn status(&self) -> EvaluationStatus {
        match self {
            EvaluationOutcome::Approved { .. } => EvaluationStatus::Approved,
            EvaluationOutcome::Rejected { .. } => EvaluationStatus::Rejected,
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            EvaluationOutcome::Approved { .. } => None,
            EvaluationOutcome::Rejected { reason } => Some(reason),
        }
    }
}

/// Ledger record for one completed evaluation. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditEvaluation {
    pub id: EvaluationId,
    pub subject_id: ClientId,
    pub subject_name: String,
    pub vehicle_id: VehicleId,
    pub requested_at: DateTime<Utc>,
    pub credit_amount: Decimal,
    pub down_payment: Decimal,
    pub installments: InstallmentPlan,
    /// Monthly rate as a fraction (0.012 for the 36 month plan).
    pub interest_rate: Decimal,
    pub monthly_payment: Decimal,
    pub risk_assessment: RiskAssessment,
    #[serde(flatten)]
    pub outcome: EvaluationOutcome,
}

impl CreditEvaluation {
    pub fn status(&self) -> EvaluationStatus {
        self.outcome.status()
    }

    pub fn financed_amount(&self) -> Decimal {
        self.credit_amount - self.down_payment
    }

    pub fn status_view(&self) -> EvaluationView {
        EvaluationView {
            id: self.id.clone(),
            subject: self.subject_name.clone(),
            vehicle_id: self.vehicle_id.clone(),
            status: self.status().label(),
            monthly_payment: self.monthly_payment,
            rejection_reason: self.outcome.rejection_reason().map(str::to_string),
        }
    }
}

/// Trimmed representation of an evaluation for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub id: EvaluationId,
    pub subject: String,
    pub vehicle_id: VehicleId,
    pub status: &'static str,
    pub monthly_payment: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}
