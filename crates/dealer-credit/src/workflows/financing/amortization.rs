use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use super::domain::InstallmentPlan;

const PERCENT: Decimal = dec!(100);

/// Fixed monthly installment for `principal` at `monthly_rate_percent`
/// (1.2 means 1.2% per month) over `term_months` payments.
///
/// French amortization: `p * r * (1 + r)^n / ((1 + r)^n - 1)` with `r` the
/// fractional monthly rate. Every step stays in `Decimal`, so equal inputs
/// produce identical payments on every platform and the result is exact to
/// 28 significant digits.
///
/// Callers must pass `principal >= 0`, `monthly_rate_percent > 0`, and
/// `term_months >= 1`; the rate table and intake validation guarantee all
/// three. A zero principal prices to a zero payment.
pub fn monthly_payment(
    principal: Decimal,
    monthly_rate_percent: Decimal,
    term_months: u32,
) -> Decimal {
    debug_assert!(principal >= Decimal::ZERO);
    debug_assert!(monthly_rate_percent > Decimal::ZERO);
    debug_assert!(term_months >= 1);

    let rate = monthly_rate_percent / PERCENT;
    let growth = (Decimal::ONE + rate).powi(i64::from(term_months));
    principal * rate * growth / (growth - Decimal::ONE)
}

/// Installment for `principal` under a supported plan's tabulated rate.
pub fn payment_for_plan(principal: Decimal, plan: InstallmentPlan) -> Decimal {
    monthly_payment(principal, plan.monthly_rate_percent(), plan.months())
}
