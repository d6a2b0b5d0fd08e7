//! Loan models for LendWise
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::EmploymentStatus;

/// Smallest principal accepted on an application
pub const MIN_LOAN_AMOUNT: Decimal = dec!(1000);

/// Largest principal accepted on an application
pub const MAX_LOAN_AMOUNT: Decimal = dec!(1000000);

/// Annual rate bounds, in percent
pub const MIN_INTEREST_RATE: Decimal = dec!(1);
pub const MAX_INTEREST_RATE: Decimal = dec!(25);

/// Loan status.
///
/// This is an open tag: the staff status endpoint may move a loan to any
/// value. Only the approve/reject workflow requires a pending loan.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Active,
    Completed,
    Defaulted,
}

impl LoanStatus {
    /// Whether payments may be recorded against a loan in this status
    pub fn accepts_payments(&self) -> bool {
        matches!(
            self,
            LoanStatus::Approved | LoanStatus::Active | LoanStatus::Defaulted
        )
    }
}

/// Fixed catalog of loan purposes
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoanPurpose {
    Home,
    Auto,
    Education,
    Personal,
    Business,
    Medical,
    DebtConsolidation,
}

impl LoanPurpose {
    pub const ALL: [LoanPurpose; 7] = [
        LoanPurpose::Home,
        LoanPurpose::Auto,
        LoanPurpose::Education,
        LoanPurpose::Personal,
        LoanPurpose::Business,
        LoanPurpose::Medical,
        LoanPurpose::DebtConsolidation,
    ];
}

/// Installment loans versus revolving credit lines
#[derive(Debug, Default, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_type", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    #[default]
    Term,
    Credit,
}

/// Status of a single scheduled installment
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Late,
    Partial,
}

/// One scheduled due payment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Installment {
    pub installment_number: u32,
    pub due_date: DateTime<Utc>,
    pub amount: Decimal,
    #[serde(default)]
    pub amount_paid: Decimal,
    pub status: InstallmentStatus,
    pub paid_date: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
}

impl Installment {
    /// Pending and partially paid installments still have money due
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self.status,
            InstallmentStatus::Pending | InstallmentStatus::Partial
        )
    }

    pub fn amount_due(&self) -> Decimal {
        (self.amount - self.amount_paid).max(Decimal::ZERO)
    }
}

/// Outcome of a recorded payment attempt
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Late,
    Partial,
    Missed,
}

/// Entry in a loan's payment history.
///
/// History is kept apart from the schedule and does not have to line up
/// with it one to one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaymentRecord {
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub recorded_at: DateTime<Utc>,
    pub installment_number: Option<u32>,
    pub transaction_id: Option<String>,
}

impl PaymentRecord {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// Loan model.
///
/// `version` counts stored writes; the store refuses an update whose version
/// no longer matches what is stored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub loan_amount: Decimal,
    pub loan_purpose: LoanPurpose,
    pub loan_type: LoanType,
    pub term_months: u32,
    pub interest_rate: Decimal,
    pub lender_name: Option<String>,
    pub credit_limit: Option<Decimal>,
    pub collateral: Option<String>,
    pub employment_status: EmploymentStatus,
    pub monthly_income: Decimal,
    pub status: LoanStatus,
    pub monthly_payment: Decimal,
    pub total_repayment: Decimal,
    pub repayment_schedule: Vec<Installment>,
    pub payment_history: Vec<PaymentRecord>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Earliest installment that still has money due
    pub fn next_payment(&self) -> Option<&Installment> {
        self.repayment_schedule.iter().find(|i| i.is_outstanding())
    }

    /// Number of installments not yet settled
    pub fn remaining_term(&self) -> u32 {
        self.repayment_schedule
            .iter()
            .filter(|i| i.is_outstanding())
            .count() as u32
    }

    /// Sum of what is still due across the schedule
    pub fn outstanding_balance(&self) -> Decimal {
        self.repayment_schedule
            .iter()
            .filter(|i| i.is_outstanding())
            .map(Installment::amount_due)
            .sum()
    }

    pub fn detail(&self) -> LoanDetail {
        LoanDetail {
            next_payment: self.next_payment().cloned(),
            remaining_term: self.remaining_term(),
            outstanding_balance: self.outstanding_balance(),
            loan: self.clone(),
        }
    }
}

/// Loan as returned by the API, with the computed repayment fields
#[derive(Debug, Serialize, Clone)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub next_payment: Option<Installment>,
    pub remaining_term: u32,
    pub outstanding_balance: Decimal,
}

/// Request to apply for a new loan
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_application", skip_on_field_errors = false))]
pub struct ApplyLoanRequest {
    #[validate(custom = "validate_loan_amount")]
    pub loan_amount: Decimal,
    pub loan_purpose: LoanPurpose,
    #[validate(range(min = 1, max = 60))]
    pub term_months: u32,
    #[validate(custom = "validate_interest_rate")]
    pub interest_rate: Option<Decimal>,
    #[validate(length(min = 1, max = 120))]
    pub lender_name: Option<String>,
    pub employment_status: EmploymentStatus,
    #[validate(custom = "validate_money")]
    pub monthly_income: Decimal,
    #[validate(length(max = 500))]
    pub collateral: Option<String>,
    #[serde(default)]
    pub loan_type: LoanType,
    #[validate(custom = "validate_money")]
    pub credit_limit: Option<Decimal>,
}

fn validate_application(request: &ApplyLoanRequest) -> Result<(), ValidationError> {
    if request.loan_type == LoanType::Credit && request.credit_limit.is_none() {
        return Err(invalid("credit_limit", "credit loans require a credit_limit"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn whole_cents(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > 2 {
        return Err(invalid("precision", "amounts must have at most 2 decimal places"));
    }
    Ok(())
}

/// Non-negative amount in whole cents
pub fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(invalid("range", "amounts must not be negative"));
    }
    whole_cents(value)
}

fn validate_loan_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value < MIN_LOAN_AMOUNT || *value > MAX_LOAN_AMOUNT {
        return Err(invalid("range", "loan amount must be between 1000 and 1000000"));
    }
    whole_cents(value)
}

fn validate_interest_rate(value: &Decimal) -> Result<(), ValidationError> {
    if *value < MIN_INTEREST_RATE || *value > MAX_INTEREST_RATE {
        return Err(invalid("range", "interest rate must be between 1 and 25 percent"));
    }
    Ok(())
}

fn validate_payment_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(invalid("range", "payment amount must be positive"));
    }
    whole_cents(value)
}

/// Request to record a repayment against a loan
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(custom = "validate_payment_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 120))]
    pub transaction_id: Option<String>,
}

/// Request to reject an application
#[derive(Debug, Deserialize, Validate)]
pub struct RejectLoanRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Request to set a loan's status directly
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLoanStatusRequest {
    pub status: LoanStatus,
}

/// Query for listing loans
#[derive(Debug, Deserialize, Validate)]
pub struct ListLoansQuery {
    pub status: Option<LoanStatus>,
}

/// Query for an amortization quote
#[derive(Debug, Deserialize, Validate)]
pub struct QuoteQuery {
    #[validate(custom = "validate_loan_amount")]
    pub principal: Decimal,
    #[validate(range(min = 1, max = 60))]
    pub term_months: u32,
    #[validate(custom = "validate_interest_rate")]
    pub interest_rate: Option<Decimal>,
    pub lender_name: Option<String>,
}

/// Amortization quote computed without persisting a loan
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub principal: Decimal,
    pub interest_rate: Decimal,
    pub term_months: u32,
    pub monthly_payment: Decimal,
    pub total_repayment: Decimal,
    pub total_interest: Decimal,
    pub repayment_schedule: Vec<Installment>,
}
