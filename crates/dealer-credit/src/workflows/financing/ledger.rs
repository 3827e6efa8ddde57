use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    ClientId, CreditEvaluation, EvaluationId, EvaluationOutcome, EvaluationStatus, InstallmentPlan,
    RiskAssessment, VehicleId,
};

/// Payload for a ledger append. The store assigns the id, so a record that
/// exists always came through `append`.
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub subject_id: ClientId,
    pub subject_name: String,
    pub vehicle_id: VehicleId,
    pub requested_at: DateTime<Utc>,
    pub credit_amount: Decimal,
    pub down_payment: Decimal,
    pub installments: InstallmentPlan,
    pub interest_rate: Decimal,
    pub monthly_payment: Decimal,
    pub risk_assessment: RiskAssessment,
    pub outcome: EvaluationOutcome,
}

impl NewEvaluation {
    fn into_record(self, id: EvaluationId) -> CreditEvaluation {
        CreditEvaluation {
            id,
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            vehicle_id: self.vehicle_id,
            requested_at: self.requested_at,
            credit_amount: self.credit_amount,
            down_payment: self.down_payment,
            installments: self.installments,
            interest_rate: self.interest_rate,
            monthly_payment: self.monthly_payment,
            risk_assessment: self.risk_assessment,
            outcome: self.outcome,
        }
    }
}

/// Read-side filter for ledger queries. An empty filter matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationFilter {
    /// Case-insensitive match against the subject's name or identifier.
    pub search: Option<String>,
    pub status: Option<EvaluationStatus>,
}

impl EvaluationFilter {
    pub fn matches(&self, record: &CreditEvaluation) -> bool {
        if let Some(status) = self.status {
            if record.status() != status {
                return false;
            }
        }

        match &self.search {
            Some(needle) if !needle.trim().is_empty() => {
                let needle = needle.trim().to_lowercase();
                record.subject_name.to_lowercase().contains(&needle)
                    || record.subject_id.0.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

/// Aggregates served to reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    /// Sum of credit amounts across approved evaluations.
    pub approved_credit_total: Decimal,
}

/// Error enumeration for ledger failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("evaluation ledger unavailable: {0}")]
    Unavailable(String),
}

/// Append-only system of record for completed evaluations. Implementations
/// never expose mutation or deletion; corrections happen by appending a new
/// evaluation for the same subject.
pub trait EvaluationLedger: Send + Sync {
    /// Record a completed evaluation, assigning its id.
    fn append(&self, evaluation: NewEvaluation) -> Result<CreditEvaluation, LedgerError>;
    /// Snapshot of matching records in insertion order.
    fn list(&self, filter: &EvaluationFilter) -> Result<Vec<CreditEvaluation>, LedgerError>;
    /// Counts by status plus the approved credit volume.
    fn stats(&self) -> Result<LedgerStats, LedgerError>;
}

#[derive(Debug, Default)]
struct LedgerInner {
    sequence: u64,
    entries: Vec<CreditEvaluation>,
}

/// Process-local ledger used by the service binary and tests. Id assignment
/// and insertion happen under one lock acquisition, so concurrent appends
/// cannot interleave between taking an id and storing the record.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl EvaluationLedger for MemoryLedger {
    fn append(&self, evaluation: NewEvaluation) -> Result<CreditEvaluation, LedgerError> {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        inner.sequence += 1;
        let id = EvaluationId(format!("eval-{:06}", inner.sequence));
        let record = evaluation.into_record(id);
        inner.entries.push(record.clone());
        Ok(record)
    }

    fn list(&self, filter: &EvaluationFilter) -> Result<Vec<CreditEvaluation>, LedgerError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner
            .entries
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        let mut stats = LedgerStats {
            total: inner.entries.len(),
            approved: 0,
            rejected: 0,
            approved_credit_total: Decimal::ZERO,
        };

        for record in &inner.entries {
            match record.status() {
                EvaluationStatus::Approved => {
                    stats.approved += 1;
                    stats.approved_credit_total += record.credit_amount;
                }
                EvaluationStatus::Rejected => stats.rejected += 1,
            }
        }

        Ok(stats)
    }
}
