use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use super::common::{
    approving_service, build_service, decision_policy, opened_session, FailingBureau, SlowBureau,
    StaticClients, StaticVehicles, StubBureau,
};
use crate::workflows::financing::domain::{
    ClientId, CreditEvaluation, EvaluationOutcome, EvaluationStatus, InstallmentPlan, RiskLevel,
    SessionId, VehicleId,
};
use crate::workflows::financing::ledger::{
    EvaluationFilter, EvaluationLedger, LedgerError, LedgerStats, MemoryLedger, NewEvaluation,
};
use crate::workflows::financing::service::{CreditEvaluationService, EvaluationError};
use crate::workflows::financing::wizard::{ValidationError, WizardError, WizardStage};

#[tokio::test]
async fn approved_submission_reaches_the_ledger() {
    let (service, ledger) = approving_service();
    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let record = service.submit(&session).await.expect("evaluation records");

    assert_eq!(record.status(), EvaluationStatus::Approved);
    assert_eq!(record.financed_amount(), dec!(51_000_000));
    assert_eq!(record.interest_rate, dec!(0.012));
    assert!(record.monthly_payment > dec!(1_752_900));
    assert!(record.monthly_payment < dec!(1_753_100));
    assert!(matches!(
        record.outcome,
        EvaluationOutcome::Approved { .. }
    ));

    let stored = ledger.list(&EvaluationFilter::default()).expect("list");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, record.id);

    // the session idles, ready for the next evaluation
    let view = service.session(&session).expect("session view");
    assert_eq!(view.snapshot.stage, WizardStage::SelectingSubject);
}

#[tokio::test]
async fn stretched_income_is_rejected_with_the_standard_reason() {
    let (service, ledger) = approving_service();
    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(3_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let record = service.submit(&session).await.expect("evaluation records");

    assert_eq!(record.status(), EvaluationStatus::Rejected);
    assert_eq!(
        record.outcome.rejection_reason(),
        Some("insufficient credit score or limited payment capacity")
    );
    // rejections are recorded just like approvals
    assert_eq!(ledger.list(&EvaluationFilter::default()).expect("list").len(), 1);
}

#[tokio::test]
async fn weak_scores_are_rejected_and_carry_the_debt_flag() {
    let (service, _ledger) = build_service(StubBureau::scoring(450));
    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let record = service.submit(&session).await.expect("evaluation records");

    assert_eq!(record.status(), EvaluationStatus::Rejected);
    assert!(record.risk_assessment.has_debts);
    assert_eq!(record.risk_assessment.risk_level, RiskLevel::High);
}

#[tokio::test]
async fn unknown_subject_is_reported_before_a_session_exists() {
    let (service, _ledger) = approving_service();
    let err = service
        .start_evaluation(
            ClientId("C-404".to_string()),
            VehicleId("V-2001".to_string()),
        )
        .expect_err("subject not in the directory");
    assert!(matches!(
        err,
        EvaluationError::Wizard(WizardError::Validation(ValidationError::UnknownSubject(_)))
    ));
}

#[tokio::test]
async fn unknown_vehicle_is_reported_before_a_session_exists() {
    let (service, _ledger) = approving_service();
    let err = service
        .start_evaluation(
            ClientId("C-1001".to_string()),
            VehicleId("V-404".to_string()),
        )
        .expect_err("vehicle not in the inventory");
    assert!(matches!(
        err,
        EvaluationError::Wizard(WizardError::Validation(ValidationError::UnknownVehicle(_)))
    ));
}

#[tokio::test]
async fn failed_assessments_leave_no_ledger_trace_and_reopen_the_session() {
    let (service, ledger) = build_service(FailingBureau);
    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let err = service.submit(&session).await.expect_err("bureau is down");
    assert!(matches!(err, EvaluationError::Assessment(_)));
    assert!(ledger.list(&EvaluationFilter::default()).expect("list").is_empty());

    let view = service.session(&session).expect("session view");
    assert_eq!(view.snapshot.stage, WizardStage::EnteringFinancials);
    let draft = view.snapshot.draft.expect("terms survive the failure");
    assert_eq!(draft.monthly_income, Some(dec!(8_000_000)));
    assert_eq!(draft.installment_count, 36);

    // resubmission is legal; it just fails again while the bureau is down
    let err = service.submit(&session).await.expect_err("still down");
    assert!(matches!(err, EvaluationError::Assessment(_)));
}

#[tokio::test]
async fn slow_bureaus_trip_the_assessment_timeout() {
    let ledger = Arc::new(MemoryLedger::default());
    let service = CreditEvaluationService::with_assessment_timeout(
        Arc::new(StaticClients::seeded()),
        Arc::new(StaticVehicles::seeded()),
        Arc::new(SlowBureau {
            delay: Duration::from_secs(5),
            score: 750,
        }),
        ledger.clone(),
        decision_policy(),
        Duration::from_millis(20),
    );

    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let err = service.submit(&session).await.expect_err("bureau too slow");
    assert!(matches!(err, EvaluationError::AssessmentTimeout(_)));
    assert!(ledger.list(&EvaluationFilter::default()).expect("list").is_empty());

    let view = service.session(&session).expect("session view");
    assert_eq!(view.snapshot.stage, WizardStage::EnteringFinancials);
}

#[tokio::test]
async fn concurrent_resubmission_is_refused_while_assessing() {
    let (service, _ledger) = build_service(SlowBureau {
        delay: Duration::from_millis(100),
        score: 750,
    });
    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let background = tokio::spawn({
        let service = Arc::clone(&service);
        let session = session.clone();
        async move { service.submit(&session).await }
    });

    // give the background submission time to reach the assessment
    tokio::time::sleep(Duration::from_millis(20)).await;
    let err = service.submit(&session).await.expect_err("already assessing");
    assert!(matches!(
        err,
        EvaluationError::Wizard(WizardError::InvalidTransition { .. })
    ));

    let record = background
        .await
        .expect("task joins")
        .expect("first submission lands");
    assert_eq!(record.status(), EvaluationStatus::Approved);
}

#[tokio::test]
async fn cancellation_keeps_the_ledger_untouched() {
    let (service, ledger) = approving_service();
    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let view = service.cancel(&session).expect("cancellation resets");
    assert_eq!(view.snapshot.stage, WizardStage::SelectingSubject);
    assert!(ledger.list(&EvaluationFilter::default()).expect("list").is_empty());
}

#[tokio::test]
async fn sessions_are_isolated_from_each_other() {
    let (service, ledger) = approving_service();
    let first = opened_session(&service);
    let second = opened_session(&service);
    assert_ne!(first, second);

    // a bad entry on one session never bleeds into the other
    service
        .set_financials(&first, dec!(-1), dec!(0), InstallmentPlan::Months12)
        .expect_err("invalid income");
    service
        .set_financials(
            &second,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let record = service.submit(&second).await.expect("evaluation records");
    assert_eq!(record.status(), EvaluationStatus::Approved);
    assert_eq!(ledger.list(&EvaluationFilter::default()).expect("list").len(), 1);

    let untouched = service.session(&first).expect("first session view");
    assert_eq!(untouched.snapshot.stage, WizardStage::EnteringFinancials);
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let (service, _ledger) = approving_service();
    let missing = SessionId("sess-999999".to_string());
    let err = service.session(&missing).expect_err("no such session");
    assert!(matches!(err, EvaluationError::SessionNotFound(_)));
}

#[tokio::test]
async fn statistics_track_both_outcomes() {
    let (service, _ledger) = approving_service();

    for income in [dec!(8_000_000), dec!(3_000_000)] {
        let session = opened_session(&service);
        service
            .set_financials(
                &session,
                income,
                dec!(17_000_000),
                InstallmentPlan::Months36,
            )
            .expect("terms accepted");
        service.submit(&session).await.expect("evaluation records");
    }

    let stats = service.statistics().expect("stats");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.approved, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.approved_credit_total, dec!(68_000_000));
}

struct BrokenLedger;

impl EvaluationLedger for BrokenLedger {
    fn append(&self, _evaluation: NewEvaluation) -> Result<CreditEvaluation, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn list(&self, _filter: &EvaluationFilter) -> Result<Vec<CreditEvaluation>, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        Err(LedgerError::Unavailable("ledger offline".to_string()))
    }
}

#[tokio::test]
async fn ledger_outages_reopen_the_session_for_retry() {
    let service = CreditEvaluationService::new(
        Arc::new(StaticClients::seeded()),
        Arc::new(StaticVehicles::seeded()),
        Arc::new(StubBureau::scoring(750)),
        Arc::new(BrokenLedger),
        decision_policy(),
    );

    let session = opened_session(&service);
    service
        .set_financials(
            &session,
            dec!(8_000_000),
            dec!(17_000_000),
            InstallmentPlan::Months36,
        )
        .expect("terms accepted");

    let err = service.submit(&session).await.expect_err("nowhere to record");
    assert!(matches!(err, EvaluationError::Ledger(_)));

    let view = service.session(&session).expect("session view");
    assert_eq!(view.snapshot.stage, WizardStage::EnteringFinancials);
}
