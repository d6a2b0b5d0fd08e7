//! Amortization engine
//!
//! Turns a principal, an annual rate and a term into a fixed monthly payment
//! and the full schedule of due dates. Everything here is a pure function of
//! its inputs; the schedule anchor is passed in by the caller.

use chrono::{DateTime, Months, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::loan::{Installment, InstallmentStatus};

/// Annual rate applied when neither the request nor the lender tier sets one
pub const DEFAULT_INTEREST_RATE: Decimal = dec!(8.5);

/// Rate for lenders whose name marks them as a premium tier
pub const PREMIUM_LENDER_RATE: Decimal = dec!(6.5);

/// Rate for lenders whose name marks them as a standard tier
pub const STANDARD_LENDER_RATE: Decimal = dec!(8.5);

/// Round an amount to whole cents, halves away from zero
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Pick the annual rate for an application.
///
/// An explicit rate wins; otherwise the lender tier naming convention
/// applies, and the default covers everything else.
pub fn resolve_interest_rate(requested: Option<Decimal>, lender_name: Option<&str>) -> Decimal {
    if let Some(rate) = requested {
        return rate;
    }
    match lender_name {
        Some(name) if name.contains("Premium") => PREMIUM_LENDER_RATE,
        Some(name) if name.contains("Standard") => STANDARD_LENDER_RATE,
        _ => DEFAULT_INTEREST_RATE,
    }
}

/// Fixed monthly payment from the annuity formula.
///
/// A zero monthly rate makes the formula divide by zero, so the principal is
/// split evenly across the term instead.
pub fn monthly_payment(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
) -> Decimal {
    if term_months == 0 {
        return round_cents(principal);
    }

    let r = annual_rate_percent / dec!(100) / dec!(12);
    if r.is_zero() {
        return round_cents(principal / Decimal::from(term_months));
    }

    // P * r * (1 + r)^n / ((1 + r)^n - 1)
    let base = Decimal::ONE + r;
    let growth = (0..term_months).fold(Decimal::ONE, |acc, _| acc * base);
    round_cents(principal * r * growth / (growth - Decimal::ONE))
}

pub fn total_repayment(monthly_payment: Decimal, term_months: u32) -> Decimal {
    round_cents(monthly_payment * Decimal::from(term_months))
}

/// Build the installment list: one per month, each due `i` calendar months
/// after `start`, all for the same flat amount.
///
/// The final installment is not adjusted for rounding residue.
pub fn generate_schedule(
    start: DateTime<Utc>,
    term_months: u32,
    monthly_payment: Decimal,
) -> Vec<Installment> {
    (1..=term_months)
        .map(|i| Installment {
            installment_number: i,
            due_date: start
                .checked_add_months(Months::new(i))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            amount: monthly_payment,
            amount_paid: Decimal::ZERO,
            status: InstallmentStatus::Pending,
            paid_date: None,
            transaction_id: None,
        })
        .collect()
}

/// Payment plan stamped onto a loan at creation
#[derive(Debug, Clone)]
pub struct RepaymentPlan {
    pub monthly_payment: Decimal,
    pub total_repayment: Decimal,
    pub schedule: Vec<Installment>,
}

impl RepaymentPlan {
    pub fn build(
        principal: Decimal,
        annual_rate_percent: Decimal,
        term_months: u32,
        start: DateTime<Utc>,
    ) -> Self {
        let monthly_payment = monthly_payment(principal, annual_rate_percent, term_months);
        Self {
            monthly_payment,
            total_repayment: total_repayment(monthly_payment, term_months),
            schedule: generate_schedule(start, term_months, monthly_payment),
        }
    }

    /// Interest paid over the life of the loan
    pub fn total_interest(&self, principal: Decimal) -> Decimal {
        self.total_repayment - principal
    }
}
