//! Credit evaluation and financing workflow for vehicle sales.
//!
//! Intake runs through a per-session wizard that collects the subject,
//! vehicle, and financial terms, validates them, and hands a frozen snapshot
//! to the evaluation pipeline. The pipeline prices the installment with the
//! amortization table, queries the risk bureau, applies the approval rule,
//! and appends the result to the evaluation ledger. Client and vehicle
//! records live in their own modules elsewhere; this workflow only reads
//! them through the directory traits on the service.

pub mod amortization;
pub mod bureau;
pub mod domain;
pub mod ledger;
pub mod policy;
pub mod router;
pub mod service;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use bureau::{BureauError, RiskAssessmentClient, SimulatedBureau};
pub use domain::{
    ClientId, ClientSummary, CreditEvaluation, EvaluationId, EvaluationOutcome, EvaluationStatus,
    EvaluationView, FinancingTerms, InstallmentPlan, RiskAssessment, RiskLevel, SessionId,
    UnsupportedInstallments, VehicleId, VehicleSummary,
};
pub use ledger::{
    EvaluationFilter, EvaluationLedger, LedgerError, LedgerStats, MemoryLedger, NewEvaluation,
};
pub use policy::{decide, CreditDecision, DecisionPolicy};
pub use router::financing_router;
pub use service::{
    ClientDirectory, CreditEvaluationService, EvaluationError, SessionView, VehicleDirectory,
};
pub use wizard::{
    CreditWizard, DraftView, ValidationError, WizardError, WizardSnapshot, WizardStage,
};
