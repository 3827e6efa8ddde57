use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::domain::RiskAssessment;

/// Wording stamped on every rejected evaluation. Kept deliberately generic;
/// the stored risk assessment carries the detail.
pub const REJECTION_REASON: &str = "insufficient credit score or limited payment capacity";

/// Product thresholds behind the approval rule, overridable per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// Bureau score at or above which the subject counts as creditworthy.
    pub minimum_score: u16,
    /// Ceiling on monthly installment divided by monthly income.
    pub max_payment_to_income: Decimal,
    /// Fraction of the vehicle price suggested as the initial down payment.
    pub down_payment_fraction: Decimal,
}

impl DecisionPolicy {
    /// Down payment seeded into a fresh intake draft for a given price.
    pub fn suggested_down_payment(&self, vehicle_price: Decimal) -> Decimal {
        vehicle_price * self.down_payment_fraction
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            minimum_score: 600,
            max_payment_to_income: dec!(0.30),
            down_payment_fraction: dec!(0.20),
        }
    }
}

/// Outcome of the approval rule before it is stamped into a ledger record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CreditDecision {
    Approved,
    Rejected { reason: String },
}

impl CreditDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, CreditDecision::Approved)
    }
}

/// Apply the approval rule: the subject's score must clear the policy floor
/// and the installment must fit inside the payment-to-income ceiling. Both
/// conditions are required; failing either one rejects.
///
/// Pure over its inputs. `monthly_income` is validated positive upstream, so
/// the ratio is always well defined here.
pub fn decide(
    monthly_payment: Decimal,
    monthly_income: Decimal,
    risk: &RiskAssessment,
    policy: &DecisionPolicy,
) -> CreditDecision {
    let payment_to_income = monthly_payment / monthly_income;

    if risk.score >= policy.minimum_score && payment_to_income <= policy.max_payment_to_income {
        CreditDecision::Approved
    } else {
        CreditDecision::Rejected {
            reason: REJECTION_REASON.to_string(),
        }
    }
}
