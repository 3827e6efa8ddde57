use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::workflows::financing::amortization::{monthly_payment, payment_for_plan};
use crate::workflows::financing::domain::{InstallmentPlan, UnsupportedInstallments};

#[test]
fn textbook_twelve_month_loan_prices_exactly() {
    // 100,000 at 1% per month over 12 months is the worked example every
    // amortization table is checked against.
    let payment = monthly_payment(dec!(100_000), dec!(1.0), 12);
    assert_eq!(payment.round_dp(2), dec!(8884.88));
}

#[test]
fn zero_principal_prices_to_zero() {
    assert_eq!(monthly_payment(Decimal::ZERO, dec!(1.2), 36), Decimal::ZERO);
}

#[test]
fn payment_rises_with_the_rate() {
    let principal = dec!(50_000_000);
    let cheap = monthly_payment(principal, dec!(1.0), 36);
    let dear = monthly_payment(principal, dec!(1.4), 36);
    assert!(dear > cheap, "higher rate must cost more per month");
}

#[test]
fn payment_falls_as_the_term_stretches() {
    let principal = dec!(50_000_000);
    let mut previous = monthly_payment(principal, dec!(1.2), 12);
    for term in [24, 36, 48, 60] {
        let current = monthly_payment(principal, dec!(1.2), term);
        assert!(current < previous, "{term} months should cost less per month");
        previous = current;
    }
}

#[test]
fn equal_inputs_price_identically() {
    let first = monthly_payment(dec!(51_000_000), dec!(1.2), 36);
    let second = monthly_payment(dec!(51_000_000), dec!(1.2), 36);
    assert_eq!(first, second);
}

#[test]
fn plan_pricing_uses_the_tabulated_rate() {
    let principal = dec!(51_000_000);
    let priced = payment_for_plan(principal, InstallmentPlan::Months36);
    assert_eq!(priced, monthly_payment(principal, dec!(1.2), 36));
    assert!(priced > dec!(1_752_900) && priced < dec!(1_753_100));
}

#[test]
fn rate_table_matches_the_product_terms() {
    let expected = [
        (InstallmentPlan::Months12, 12u32, dec!(1.0)),
        (InstallmentPlan::Months24, 24, dec!(1.1)),
        (InstallmentPlan::Months36, 36, dec!(1.2)),
        (InstallmentPlan::Months48, 48, dec!(1.3)),
        (InstallmentPlan::Months60, 60, dec!(1.4)),
    ];

    for (plan, months, rate) in expected {
        assert_eq!(plan.months(), months);
        assert_eq!(plan.monthly_rate_percent(), rate);
        assert_eq!(plan.monthly_rate_fraction(), rate / dec!(100));
        assert_eq!(InstallmentPlan::try_from(months).expect("supported"), plan);
    }
}

#[test]
fn off_table_installment_counts_are_rejected() {
    for count in [0u32, 6, 13, 18, 72, 120] {
        let err = InstallmentPlan::try_from(count).expect_err("outside the table");
        assert_eq!(err, UnsupportedInstallments(count));
    }
}
