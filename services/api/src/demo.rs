use crate::infra::{InMemoryClientDirectory, InMemoryVehicleDirectory};
use clap::Args;
use dealer_credit::error::AppError;
use dealer_credit::workflows::financing::amortization;
use dealer_credit::workflows::financing::{
    ClientId, CreditEvaluationService, DecisionPolicy, EvaluationError, EvaluationFilter,
    EvaluationStatus, InstallmentPlan, MemoryLedger, SimulatedBureau, ValidationError, VehicleId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

type DemoService = CreditEvaluationService<
    InMemoryClientDirectory,
    InMemoryVehicleDirectory,
    SimulatedBureau,
    MemoryLedger,
>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Client to evaluate (C-1001 through C-1004 are seeded)
    #[arg(long, default_value = "C-1001")]
    pub(crate) subject: String,
    /// Vehicle to finance (V-2001 through V-2004 are seeded)
    #[arg(long, default_value = "V-2001")]
    pub(crate) vehicle: String,
    /// Declared monthly income
    #[arg(long, default_value = "8000000", value_parser = crate::infra::parse_amount)]
    pub(crate) monthly_income: Decimal,
    /// Down payment (defaults to the wizard's suggested fraction of the price)
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) down_payment: Option<Decimal>,
    /// Installment count: 12, 24, 36, 48 or 60
    #[arg(long, default_value_t = 36)]
    pub(crate) installments: u32,
    /// Skip the stretched-budget rejection scenario
    #[arg(long)]
    pub(crate) skip_rejection: bool,
}

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Vehicle price to finance
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) price: Decimal,
    /// Down payment (defaults to the policy suggestion)
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) down_payment: Option<Decimal>,
    /// Restrict the quote to one installment count instead of the full table
    #[arg(long)]
    pub(crate) installments: Option<u32>,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let QuoteArgs {
        price,
        down_payment,
        installments,
    } = args;

    if price <= Decimal::ZERO {
        println!("Nothing to quote: the vehicle price must be positive");
        return Ok(());
    }

    let policy = DecisionPolicy::default();
    let down_payment = down_payment.unwrap_or_else(|| policy.suggested_down_payment(price));
    if down_payment < Decimal::ZERO || down_payment >= price {
        println!("Nothing to quote: down payment {down_payment} must stay below the price {price}");
        return Ok(());
    }
    let financed = price - down_payment;

    let plans = match installments {
        Some(count) => {
            let plan = InstallmentPlan::try_from(count)
                .map_err(|err| EvaluationError::from(ValidationError::from(err)))?;
            vec![plan]
        }
        None => InstallmentPlan::ALL.to_vec(),
    };

    println!("Financing quote");
    println!("- Vehicle price {price} | down payment {down_payment} | financed {financed}");
    for plan in plans {
        let payment = amortization::payment_for_plan(financed, plan);
        println!(
            "- {} months at {}% monthly: {} per installment",
            plan.months(),
            plan.monthly_rate_percent(),
            payment
        );
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        subject,
        vehicle,
        monthly_income,
        down_payment,
        installments,
        skip_rejection,
    } = args;

    let plan = InstallmentPlan::try_from(installments)
        .map_err(|err| EvaluationError::from(ValidationError::from(err)))?;

    println!("Dealer credit evaluation demo");

    let clients = Arc::new(InMemoryClientDirectory::seeded());
    let vehicles = Arc::new(InMemoryVehicleDirectory::seeded());
    let bureau = Arc::new(SimulatedBureau::new(Duration::from_millis(250)));
    let ledger = Arc::new(MemoryLedger::default());
    let service = Arc::new(CreditEvaluationService::new(
        clients,
        vehicles,
        bureau,
        ledger,
        DecisionPolicy::default(),
    ));

    evaluate_scenario(
        &service,
        ClientId(subject),
        VehicleId(vehicle),
        monthly_income,
        down_payment,
        plan,
    )
    .await?;

    if !skip_rejection {
        println!("\nStretched budget scenario");
        evaluate_scenario(
            &service,
            ClientId("C-1002".to_string()),
            VehicleId("V-2003".to_string()),
            dec!(2_500_000),
            None,
            plan,
        )
        .await?;
    }

    let stats = service.statistics()?;
    println!("\nLedger summary");
    println!(
        "- {} evaluations | {} approved | {} rejected | {} approved credit volume",
        stats.total, stats.approved, stats.rejected, stats.approved_credit_total
    );
    for record in service.evaluations(&EvaluationFilter::default())? {
        println!(
            "- {} {} -> {} ({} per month)",
            record.id,
            record.subject_name,
            record.status().label(),
            record.monthly_payment
        );
    }

    Ok(())
}

async fn evaluate_scenario(
    service: &DemoService,
    subject: ClientId,
    vehicle: VehicleId,
    monthly_income: Decimal,
    down_payment: Option<Decimal>,
    plan: InstallmentPlan,
) -> Result<(), AppError> {
    let view = match service.start_evaluation(subject, vehicle) {
        Ok(view) => view,
        Err(err) => {
            println!("  Intake refused: {err}");
            return Ok(());
        }
    };

    let session = view.session_id;
    let draft = match view.snapshot.draft {
        Some(draft) => draft,
        None => {
            println!("  Session {session} opened without a draft");
            return Ok(());
        }
    };
    println!(
        "- Session {} opened for {} financing {}",
        session, draft.subject_name, draft.vehicle_id
    );
    println!(
        "  Seeded terms: credit {} with suggested down payment {}",
        draft.credit_amount, draft.down_payment
    );

    let down_payment = down_payment.unwrap_or(draft.down_payment);
    if let Err(err) = service.set_financials(&session, monthly_income, down_payment, plan) {
        println!("  Terms refused: {err}");
        return Ok(());
    }
    println!(
        "  Declared income {} | down payment {} | {} installments",
        monthly_income,
        down_payment,
        plan.months()
    );

    let record = match service.submit(&session).await {
        Ok(record) => record,
        Err(err) => {
            println!("  Evaluation failed: {err}");
            return Ok(());
        }
    };

    let assessment = &record.risk_assessment;
    println!(
        "  Bureau score {} ({} risk), debts on file: {}",
        assessment.score,
        assessment.risk_level.label(),
        if assessment.has_debts { "yes" } else { "no" }
    );

    match record.status() {
        EvaluationStatus::Approved => {
            println!(
                "  Approved: {} per month over {} months at {}% monthly",
                record.monthly_payment,
                record.installments.months(),
                record.installments.monthly_rate_percent()
            );
        }
        EvaluationStatus::Rejected => {
            let reason = record.outcome.rejection_reason().unwrap_or("not recorded");
            println!("  Rejected: {reason}");
        }
    }

    match serde_json::to_string_pretty(&record.status_view()) {
        Ok(json) => println!("  Public status payload:\n{json}"),
        Err(err) => println!("  Public status payload unavailable: {err}"),
    }

    Ok(())
}
