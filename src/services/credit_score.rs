//! Credit Scoring Engine for LendWise
//!
//! Folds the full set of a borrower's loans into a single score in
//! [300, 850], a qualitative band, and an account-level projection used for
//! reporting. The engine is a pure reduction over the loan set, so the result
//! does not depend on the order loans are fetched in.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::loan::{Loan, LoanPurpose, LoanStatus, LoanType};
use crate::models::BorrowerProfile;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Weight for the payment history factor
const WEIGHT_PAYMENT_HISTORY: f64 = 0.40;

/// Weight for the credit utilization factor
const WEIGHT_CREDIT_UTILIZATION: f64 = 0.20;

/// Weight for the credit mix factor
const WEIGHT_CREDIT_MIX: f64 = 0.10;

/// Weight for the account status factor
const WEIGHT_ACCOUNT_STATUS: f64 = 0.30;

/// Lowest reportable score
pub const MIN_CREDIT_SCORE: i32 = 300;

/// Highest reportable score
pub const MAX_CREDIT_SCORE: i32 = 850;

/// Distance between the lowest and highest score
const SCORE_SPREAD: f64 = (MAX_CREDIT_SCORE - MIN_CREDIT_SCORE) as f64;

/// Number of distinct purposes that earns a full credit mix factor.
/// The factor is not capped, so holding more purposes than this scores above 1.
const CREDIT_MIX_DIVISOR: f64 = 5.0;

/// Label reported instead of a band when the borrower has no loans
pub const NO_CREDIT_HISTORY: &str = "No Credit History";

// ============================================================================
// Data Models
// ============================================================================

/// Qualitative score band
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 720 => ScoreBand::Excellent,
            s if s >= 650 => ScoreBand::Good,
            s if s >= 580 => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Fair",
            ScoreBand::Poor => "Poor",
        }
    }
}

/// Raw value of each scoring factor, before weighting
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ScoreFactors {
    /// Mean share of paid history entries per loan (0.0-1.0)
    pub payment_history: f64,
    /// One minus revolving utilization (0.0-1.0)
    pub credit_utilization: f64,
    /// Distinct purposes divided by five, uncapped
    pub credit_mix: f64,
    /// Mean per-loan status contribution, may be negative
    pub account_status: f64,
}

impl ScoreFactors {
    pub fn from_loans(loans: &[Loan]) -> Self {
        Self {
            payment_history: payment_history_factor(loans),
            credit_utilization: utilization_factor(loans),
            credit_mix: credit_mix_factor(loans),
            account_status: account_status_factor(loans),
        }
    }

    /// Weighted sum mapped onto the score range, rounded and clamped
    pub fn score(&self) -> i32 {
        let weighted = self.payment_history * WEIGHT_PAYMENT_HISTORY
            + self.credit_utilization * WEIGHT_CREDIT_UTILIZATION
            + self.credit_mix * WEIGHT_CREDIT_MIX
            + self.account_status * WEIGHT_ACCOUNT_STATUS;

        let raw = (MIN_CREDIT_SCORE as f64 + weighted * SCORE_SPREAD).round();
        raw.clamp(MIN_CREDIT_SCORE as f64, MAX_CREDIT_SCORE as f64) as i32
    }
}

/// Debt and revolving credit totals over active loans
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exposure {
    pub total_debt: Decimal,
    pub total_credit: Decimal,
}

impl Exposure {
    pub fn from_loans(loans: &[Loan]) -> Self {
        let active = loans.iter().filter(|l| l.status == LoanStatus::Active);

        let zero = (Decimal::ZERO, Decimal::ZERO);
        let (total_debt, total_credit) = active.fold(zero, |(debt, credit), loan| {
            let limit = match loan.loan_type {
                LoanType::Credit => loan.credit_limit.unwrap_or(Decimal::ZERO),
                LoanType::Term => Decimal::ZERO,
            };
            (debt + loan.loan_amount, credit + limit)
        });

        Self {
            total_debt,
            total_credit,
        }
    }

    /// Debt over revolving credit, zero when there is no revolving credit
    pub fn utilization(&self) -> f64 {
        if self.total_credit > Decimal::ZERO {
            (self.total_debt / self.total_credit).to_f64().unwrap_or(0.0)
        } else {
            0.0
        }
    }

    /// Revolving headroom left after the outstanding debt
    pub fn available_credit(&self) -> Decimal {
        (self.total_credit - self.total_debt).max(Decimal::ZERO)
    }
}

/// Per-loan line in the credit report
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccountSummary {
    pub loan_id: Uuid,
    pub loan_purpose: LoanPurpose,
    pub loan_type: LoanType,
    pub status: LoanStatus,
    pub lender_name: Option<String>,
    pub loan_amount: Decimal,
    pub credit_limit: Option<Decimal>,
    pub balance: Decimal,
    pub monthly_payment: Decimal,
    pub next_payment_date: Option<DateTime<Utc>>,
    pub remaining_term: u32,
}

impl From<&Loan> for AccountSummary {
    fn from(loan: &Loan) -> Self {
        Self {
            loan_id: loan.id,
            loan_purpose: loan.loan_purpose,
            loan_type: loan.loan_type,
            status: loan.status,
            lender_name: loan.lender_name.clone(),
            loan_amount: loan.loan_amount,
            credit_limit: loan.credit_limit,
            balance: loan.outstanding_balance(),
            monthly_payment: loan.monthly_payment,
            next_payment_date: loan.next_payment().map(|i| i.due_date),
            remaining_term: loan.remaining_term(),
        }
    }
}

/// Credit report returned by the API
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreditReport {
    pub credit_score: i32,
    pub score_range: String,
    pub accounts: Vec<AccountSummary>,
    pub credit_utilization: String,
    pub total_debt: Decimal,
    pub available_credit: Decimal,
    pub open_accounts: usize,
    /// Factor breakdown; absent for the no-history report
    pub factors: Option<ScoreFactors>,
    pub borrower: Option<BorrowerProfile>,
    pub generated_at: DateTime<Utc>,
}

impl CreditReport {
    /// Sentinel report for a borrower with no loans
    pub fn no_history(borrower: Option<BorrowerProfile>, generated_at: DateTime<Utc>) -> Self {
        Self {
            credit_score: 0,
            score_range: NO_CREDIT_HISTORY.to_string(),
            accounts: vec![],
            credit_utilization: "0%".to_string(),
            total_debt: Decimal::ZERO,
            available_credit: Decimal::ZERO,
            open_accounts: 0,
            factors: None,
            borrower,
            generated_at,
        }
    }

    pub fn has_history(&self) -> bool {
        self.factors.is_some()
    }
}

// ============================================================================
// Factors
// ============================================================================

/// Mean across loans of paid entries over history length. A loan with no
/// history counts as zero.
pub fn payment_history_factor(loans: &[Loan]) -> f64 {
    if loans.is_empty() {
        return 0.0;
    }

    let total: f64 = loans
        .iter()
        .map(|loan| {
            let paid = loan.payment_history.iter().filter(|p| p.is_paid()).count();
            let entries = loan.payment_history.len().max(1);
            paid as f64 / entries as f64
        })
        .sum();

    total / loans.len() as f64
}

/// Full marks when there is no revolving exposure or all headroom is free
pub fn utilization_factor(loans: &[Loan]) -> f64 {
    1.0 - Exposure::from_loans(loans).utilization().min(1.0)
}

pub fn credit_mix_factor(loans: &[Loan]) -> f64 {
    let purposes: HashSet<LoanPurpose> = loans.iter().map(|l| l.loan_purpose).collect();
    purposes.len() as f64 / CREDIT_MIX_DIVISOR
}

fn status_contribution(status: LoanStatus) -> f64 {
    match status {
        LoanStatus::Completed => 5.0,
        LoanStatus::Active => 3.0,
        LoanStatus::Pending => 1.0,
        LoanStatus::Defaulted => -10.0,
        LoanStatus::Approved | LoanStatus::Rejected => 0.0,
    }
}

pub fn account_status_factor(loans: &[Loan]) -> f64 {
    if loans.is_empty() {
        return 0.0;
    }
    let total: f64 = loans.iter().map(|l| status_contribution(l.status)).sum();
    total / loans.len() as f64
}

// ============================================================================
// Entry points
// ============================================================================

/// Score a non-empty loan set. Returns `None` when there are no loans, since
/// the per-loan means are undefined in that case.
pub fn compute_score(loans: &[Loan]) -> Option<i32> {
    if loans.is_empty() {
        return None;
    }
    Some(ScoreFactors::from_loans(loans).score())
}

/// Utilization as a whole percentage string, "0%" when nothing is owed
pub fn utilization_percentage(total_debt: Decimal, available_credit: Decimal) -> String {
    let denominator = total_debt + available_credit;
    if total_debt <= Decimal::ZERO || denominator <= Decimal::ZERO {
        return "0%".to_string();
    }
    let percent = (total_debt / denominator * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    format!("{}%", percent.to_i64().unwrap_or(0))
}

/// Build the full credit report for one borrower's loans
pub fn build_report(
    loans: &[Loan],
    borrower: Option<BorrowerProfile>,
    generated_at: DateTime<Utc>,
) -> CreditReport {
    if loans.is_empty() {
        return CreditReport::no_history(borrower, generated_at);
    }

    let factors = ScoreFactors::from_loans(loans);
    let credit_score = factors.score();
    let exposure = Exposure::from_loans(loans);
    let total_debt = exposure.total_debt;
    let available_credit = exposure.available_credit();

    CreditReport {
        credit_score,
        score_range: ScoreBand::from_score(credit_score).label().to_string(),
        accounts: loans.iter().map(AccountSummary::from).collect(),
        credit_utilization: utilization_percentage(total_debt, available_credit),
        total_debt,
        available_credit,
        open_accounts: loans
            .iter()
            .filter(|l| l.status == LoanStatus::Active)
            .count(),
        factors: Some(factors),
        borrower,
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_band_from_score() {
        assert_eq!(ScoreBand::from_score(850), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(720), ScoreBand::Excellent);
        assert_eq!(ScoreBand::from_score(719), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(650), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(649), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_score(580), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_score(579), ScoreBand::Poor);
        assert_eq!(ScoreBand::from_score(300), ScoreBand::Poor);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total = WEIGHT_PAYMENT_HISTORY
            + WEIGHT_CREDIT_UTILIZATION
            + WEIGHT_CREDIT_MIX
            + WEIGHT_ACCOUNT_STATUS;
        assert!((total - 1.0).abs() < 0.001, "Weights should sum to 1.0");
    }

    #[test]
    fn test_score_is_clamped() {
        let high = ScoreFactors {
            payment_history: 1.0,
            credit_utilization: 1.0,
            credit_mix: 1.4,
            account_status: 5.0,
        };
        assert_eq!(high.score(), MAX_CREDIT_SCORE);

        let low = ScoreFactors {
            payment_history: 0.0,
            credit_utilization: 0.0,
            credit_mix: 0.2,
            account_status: -10.0,
        };
        assert_eq!(low.score(), MIN_CREDIT_SCORE);
    }

    #[test]
    fn test_zero_factors_score_the_floor() {
        let zero = ScoreFactors {
            payment_history: 0.0,
            credit_utilization: 0.0,
            credit_mix: 0.0,
            account_status: 0.0,
        };
        assert_eq!(zero.score(), MIN_CREDIT_SCORE);
    }

    #[test]
    fn test_utilization_percentage() {
        let amount = |value: i64| Decimal::from(value);
        assert_eq!(utilization_percentage(Decimal::ZERO, amount(10_000)), "0%");
        assert_eq!(utilization_percentage(Decimal::ZERO, Decimal::ZERO), "0%");
        assert_eq!(utilization_percentage(amount(5_000), amount(5_000)), "50%");
        assert_eq!(utilization_percentage(amount(1_000), amount(2_000)), "33%");
        assert_eq!(utilization_percentage(amount(5_000), Decimal::ZERO), "100%");
        // 1 of 8 is 12.5%, rounded up
        assert_eq!(utilization_percentage(amount(1), amount(7)), "13%");
    }

    #[test]
    fn test_empty_set_has_no_score() {
        assert_eq!(compute_score(&[]), None);
        assert_eq!(payment_history_factor(&[]), 0.0);
        assert_eq!(account_status_factor(&[]), 0.0);
    }
}
