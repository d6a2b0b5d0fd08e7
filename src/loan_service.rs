//! Loan service layer - Business logic for the loan lifecycle

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::loan::{
    ApplyLoanRequest, InstallmentStatus, Loan, LoanDetail, LoanStatus, PaymentRecord,
    PaymentStatus, QuoteQuery, QuoteResponse, RecordPaymentRequest,
};
use crate::models::BorrowerProfile;
use crate::services::amortization::{resolve_interest_rate, RepaymentPlan};
use crate::services::credit_score::{build_report, CreditReport};
use crate::store::{Store, StoreError};

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Loan not found")]
    LoanNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Loan is {0:?}; only pending applications can be reviewed")]
    NotPending(LoanStatus),

    #[error("Loan is {0:?} and does not accept payments")]
    NotAcceptingPayments(LoanStatus),

    #[error("Payment of {amount} exceeds the outstanding balance of {outstanding}")]
    Overpayment {
        amount: Decimal,
        outstanding: Decimal,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reads and writes of one loan before a concurrent write is reported
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Loan service for managing loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl LoanService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a pending loan with its repayment schedule anchored at now
    pub async fn apply_loan(
        &self,
        user_id: Uuid,
        request: ApplyLoanRequest,
    ) -> Result<Loan, LoanError> {
        let now = self.clock.now();
        let interest_rate =
            resolve_interest_rate(request.interest_rate, request.lender_name.as_deref());
        let plan = RepaymentPlan::build(
            request.loan_amount,
            interest_rate,
            request.term_months,
            now,
        );

        let loan = Loan {
            id: Uuid::new_v4(),
            user_id,
            loan_amount: request.loan_amount,
            loan_purpose: request.loan_purpose,
            loan_type: request.loan_type,
            term_months: request.term_months,
            interest_rate,
            lender_name: request.lender_name,
            credit_limit: request.credit_limit,
            collateral: request.collateral,
            employment_status: request.employment_status,
            monthly_income: request.monthly_income,
            status: LoanStatus::Pending,
            monthly_payment: plan.monthly_payment,
            total_repayment: plan.total_repayment,
            repayment_schedule: plan.schedule,
            payment_history: vec![],
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_loan(&loan).await?;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %user_id,
            amount = %loan.loan_amount,
            term_months = loan.term_months,
            interest_rate = %interest_rate,
            "Loan application created"
        );

        Ok(loan)
    }

    /// Fetch one of the caller's loans. Loans owned by someone else read as
    /// missing.
    pub async fn get_loan(&self, user_id: Uuid, loan_id: Uuid) -> Result<LoanDetail, LoanError> {
        let loan = self.owned_loan(user_id, loan_id).await?;
        Ok(loan.detail())
    }

    /// The caller's loans, oldest first
    pub async fn list_loans(&self, user_id: Uuid) -> Result<Vec<LoanDetail>, LoanError> {
        let loans = self.store.find_loans_by_user(user_id).await?;
        Ok(loans.iter().map(Loan::detail).collect())
    }

    /// Credit report over every loan the user holds
    pub async fn credit_report(&self, user_id: Uuid) -> Result<CreditReport, LoanError> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(LoanError::UserNotFound)?;
        let loans = self.store.find_loans_by_user(user_id).await?;

        let report = build_report(&loans, Some(BorrowerProfile::from(&user)), self.clock.now());

        tracing::info!(
            user_id = %user_id,
            loans = loans.len(),
            credit_score = report.credit_score,
            "Credit report generated"
        );

        Ok(report)
    }

    /// Amortization quote; nothing is persisted
    pub fn quote(&self, query: &QuoteQuery) -> QuoteResponse {
        let interest_rate =
            resolve_interest_rate(query.interest_rate, query.lender_name.as_deref());
        let plan = RepaymentPlan::build(
            query.principal,
            interest_rate,
            query.term_months,
            self.clock.now(),
        );

        QuoteResponse {
            principal: query.principal,
            interest_rate,
            term_months: query.term_months,
            monthly_payment: plan.monthly_payment,
            total_repayment: plan.total_repayment,
            total_interest: plan.total_interest(query.principal),
            repayment_schedule: plan.schedule,
        }
    }

    /// Every loan, newest first, optionally filtered by status
    pub async fn list_all_loans(
        &self,
        status: Option<LoanStatus>,
    ) -> Result<Vec<LoanDetail>, LoanError> {
        let loans = self.store.list_loans(status).await?;
        Ok(loans.iter().map(Loan::detail).collect())
    }

    /// Approve a pending application; the loan becomes active
    pub async fn approve_loan(
        &self,
        loan_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<LoanDetail, LoanError> {
        let loan = self
            .modify_loan(loan_id, None, |loan, now| {
                if loan.status != LoanStatus::Pending {
                    return Err(LoanError::NotPending(loan.status));
                }
                loan.status = LoanStatus::Active;
                loan.approved_by = Some(reviewer_id);
                loan.approved_at = Some(now);
                Ok(())
            })
            .await?;

        tracing::info!(loan_id = %loan.id, reviewer_id = %reviewer_id, "Loan approved");

        Ok(loan.detail())
    }

    pub async fn reject_loan(
        &self,
        loan_id: Uuid,
        reviewer_id: Uuid,
        reason: String,
    ) -> Result<LoanDetail, LoanError> {
        let loan = self
            .modify_loan(loan_id, None, |loan, _| {
                if loan.status != LoanStatus::Pending {
                    return Err(LoanError::NotPending(loan.status));
                }
                loan.status = LoanStatus::Rejected;
                loan.rejection_reason = Some(reason.clone());
                Ok(())
            })
            .await?;

        tracing::info!(loan_id = %loan.id, reviewer_id = %reviewer_id, "Loan rejected");

        Ok(loan.detail())
    }

    /// Set any status. No transition rules apply here.
    pub async fn update_status(
        &self,
        loan_id: Uuid,
        status: LoanStatus,
    ) -> Result<LoanDetail, LoanError> {
        let mut previous = status;
        let loan = self
            .modify_loan(loan_id, None, |loan, _| {
                previous = loan.status;
                loan.status = status;
                Ok(())
            })
            .await?;

        tracing::info!(
            loan_id = %loan.id,
            from = ?previous,
            to = ?status,
            "Loan status updated"
        );

        Ok(loan.detail())
    }

    /// Apply a borrower payment against the schedule
    pub async fn record_payment(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<LoanDetail, LoanError> {
        let amount = request.amount;
        let loan = self
            .modify_loan(loan_id, Some(user_id), |loan, now| {
                if !loan.status.accepts_payments() {
                    return Err(LoanError::NotAcceptingPayments(loan.status));
                }

                let outstanding = loan.outstanding_balance();
                if amount > outstanding {
                    return Err(LoanError::Overpayment {
                        amount,
                        outstanding,
                    });
                }

                apply_payment(loan, amount, request.transaction_id.clone(), now);
                if loan.next_payment().is_none() {
                    loan.status = LoanStatus::Completed;
                }
                Ok(())
            })
            .await?;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %user_id,
            amount = %amount,
            status = ?loan.status,
            "Payment recorded"
        );

        Ok(loan.detail())
    }

    /// Read, change and write back one loan.
    ///
    /// The write only lands if the stored version still matches the one read.
    /// After a lost race the loan is read again and `change` runs again on the
    /// fresh copy. `owner` restricts the lookup to that user's loans.
    async fn modify_loan<F>(
        &self,
        loan_id: Uuid,
        owner: Option<Uuid>,
        mut change: F,
    ) -> Result<Loan, LoanError>
    where
        F: FnMut(&mut Loan, DateTime<Utc>) -> Result<(), LoanError> + Send,
    {
        let mut attempt = 1;
        loop {
            let mut loan = match owner {
                Some(user_id) => self.owned_loan(user_id, loan_id).await?,
                None => self.find_loan(loan_id).await?,
            };

            let now = self.clock.now();
            change(&mut loan, now)?;
            loan.updated_at = now;

            match self.store.update_loan(&loan).await {
                Ok(()) => {
                    loan.version += 1;
                    return Ok(loan);
                }
                Err(StoreError::Stale) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::debug!(loan_id = %loan_id, attempt, "Concurrent loan write, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn find_loan(&self, loan_id: Uuid) -> Result<Loan, LoanError> {
        self.store
            .find_loan(loan_id)
            .await?
            .ok_or(LoanError::LoanNotFound)
    }

    async fn owned_loan(&self, user_id: Uuid, loan_id: Uuid) -> Result<Loan, LoanError> {
        match self.store.find_loan(loan_id).await? {
            Some(loan) if loan.user_id == user_id => Ok(loan),
            _ => Err(LoanError::LoanNotFound),
        }
    }
}

/// Settle outstanding installments in due-date order.
///
/// Each installment the payment touches gets one history record: `Paid` or
/// `Late` when it is settled in full (late if settled after its due date),
/// `Partial` when the money runs out first.
fn apply_payment(
    loan: &mut Loan,
    amount: Decimal,
    transaction_id: Option<String>,
    now: DateTime<Utc>,
) {
    let mut remaining = amount;

    for installment in loan
        .repayment_schedule
        .iter_mut()
        .filter(|i| i.is_outstanding())
    {
        if remaining <= Decimal::ZERO {
            break;
        }

        let due = installment.amount_due();
        let (applied, status) = if remaining >= due {
            installment.amount_paid = installment.amount;
            installment.paid_date = Some(now);
            if now <= installment.due_date {
                installment.status = InstallmentStatus::Paid;
                (due, PaymentStatus::Paid)
            } else {
                installment.status = InstallmentStatus::Late;
                (due, PaymentStatus::Late)
            }
        } else {
            installment.amount_paid += remaining;
            installment.status = InstallmentStatus::Partial;
            (remaining, PaymentStatus::Partial)
        };
        installment.transaction_id = transaction_id.clone();
        remaining -= applied;

        loan.payment_history.push(PaymentRecord {
            amount: applied,
            status,
            recorded_at: now,
            installment_number: Some(installment.installment_number),
            transaction_id: transaction_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::loan::{LoanPurpose, LoanType};
    use crate::models::{EmploymentStatus, User};
    use crate::store::{LoanStore, MemoryStore, UserStore};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap()
    }

    fn service_at(now: DateTime<Utc>, store: Arc<MemoryStore>) -> LoanService {
        LoanService::new(store, Arc::new(FixedClock(now)))
    }

    fn application(amount: Decimal, term_months: u32) -> ApplyLoanRequest {
        ApplyLoanRequest {
            loan_amount: amount,
            loan_purpose: LoanPurpose::Auto,
            term_months,
            interest_rate: None,
            lender_name: None,
            employment_status: EmploymentStatus::Employed,
            monthly_income: dec!(5000),
            collateral: None,
            loan_type: LoanType::Term,
            credit_limit: None,
        }
    }

    fn payment(amount: Decimal) -> RecordPaymentRequest {
        RecordPaymentRequest {
            amount,
            transaction_id: Some("txn-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_apply_creates_pending_loan_with_schedule() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let user_id = Uuid::new_v4();

        let loan = service
            .apply_loan(user_id, application(dec!(12000), 12))
            .await
            .unwrap();

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.version, 0);
        assert_eq!(loan.interest_rate, dec!(8.5));
        assert_eq!(loan.monthly_payment, dec!(1046.64));
        assert_eq!(loan.total_repayment, dec!(12559.68));
        assert_eq!(loan.repayment_schedule.len(), 12);
        assert_eq!(
            loan.repayment_schedule[0].due_date,
            Utc.with_ymd_and_hms(2026, 2, 15, 9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_lender_tier_sets_rate() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let mut request = application(dec!(10000), 24);
        request.lender_name = Some("Premium Credit Union".to_string());

        let loan = service.apply_loan(Uuid::new_v4(), request).await.unwrap();
        assert_eq!(loan.interest_rate, dec!(6.5));
    }

    #[tokio::test]
    async fn test_get_loan_hides_other_users_loans() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let owner = Uuid::new_v4();
        let loan = service
            .apply_loan(owner, application(dec!(5000), 6))
            .await
            .unwrap();

        assert!(service.get_loan(owner, loan.id).await.is_ok());
        assert!(matches!(
            service.get_loan(Uuid::new_v4(), loan.id).await,
            Err(LoanError::LoanNotFound)
        ));
    }

    #[tokio::test]
    async fn test_approve_requires_pending() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let reviewer = Uuid::new_v4();
        let loan = service
            .apply_loan(Uuid::new_v4(), application(dec!(5000), 6))
            .await
            .unwrap();

        let approved = service.approve_loan(loan.id, reviewer).await.unwrap();
        assert_eq!(approved.loan.status, LoanStatus::Active);
        assert_eq!(approved.loan.approved_by, Some(reviewer));
        assert_eq!(approved.loan.approved_at, Some(start()));

        assert!(matches!(
            service.approve_loan(loan.id, reviewer).await,
            Err(LoanError::NotPending(LoanStatus::Active))
        ));
        assert!(matches!(
            service
                .reject_loan(loan.id, reviewer, "too late".to_string())
                .await,
            Err(LoanError::NotPending(LoanStatus::Active))
        ));
    }

    #[tokio::test]
    async fn test_update_status_is_permissive() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let loan = service
            .apply_loan(Uuid::new_v4(), application(dec!(5000), 6))
            .await
            .unwrap();

        let completed = service
            .update_status(loan.id, LoanStatus::Completed)
            .await
            .unwrap();
        assert_eq!(completed.loan.status, LoanStatus::Completed);

        let reopened = service
            .update_status(loan.id, LoanStatus::Pending)
            .await
            .unwrap();
        assert_eq!(reopened.loan.status, LoanStatus::Pending);
    }

    #[tokio::test]
    async fn test_payment_refused_on_pending_loan() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let user_id = Uuid::new_v4();
        let loan = service
            .apply_loan(user_id, application(dec!(5000), 6))
            .await
            .unwrap();

        assert!(matches!(
            service.record_payment(user_id, loan.id, payment(dec!(100))).await,
            Err(LoanError::NotAcceptingPayments(LoanStatus::Pending))
        ));
    }

    #[tokio::test]
    async fn test_payments_settle_installments_in_order() {
        let store = Arc::new(MemoryStore::new());
        let service = service_at(start(), store.clone());
        let user_id = Uuid::new_v4();
        let loan = service
            .apply_loan(user_id, application(dec!(1200), 2))
            .await
            .unwrap();
        service.approve_loan(loan.id, Uuid::new_v4()).await.unwrap();
        let installment = loan.monthly_payment;

        // One full installment and part of the next
        let detail = service
            .record_payment(user_id, loan.id, payment(installment + dec!(100)))
            .await
            .unwrap();

        let schedule = &detail.loan.repayment_schedule;
        assert_eq!(schedule[0].status, InstallmentStatus::Paid);
        assert_eq!(schedule[1].status, InstallmentStatus::Partial);
        assert_eq!(schedule[1].amount_paid, dec!(100));
        assert_eq!(detail.remaining_term, 1);
        assert_eq!(detail.outstanding_balance, installment - dec!(100));

        let statuses: Vec<PaymentStatus> = detail
            .loan
            .payment_history
            .iter()
            .map(|p| p.status)
            .collect();
        assert_eq!(statuses, vec![PaymentStatus::Paid, PaymentStatus::Partial]);
        assert_eq!(detail.loan.status, LoanStatus::Active);
    }

    #[tokio::test]
    async fn test_final_payment_completes_loan() {
        let store = Arc::new(MemoryStore::new());
        let service = service_at(start(), store.clone());
        let user_id = Uuid::new_v4();
        let loan = service
            .apply_loan(user_id, application(dec!(1200), 2))
            .await
            .unwrap();
        service.approve_loan(loan.id, Uuid::new_v4()).await.unwrap();

        let detail = service
            .record_payment(user_id, loan.id, payment(loan.total_repayment))
            .await
            .unwrap();

        assert_eq!(detail.loan.status, LoanStatus::Completed);
        assert!(detail.next_payment.is_none());
        assert_eq!(detail.outstanding_balance, Decimal::ZERO);

        assert!(matches!(
            service.record_payment(user_id, loan.id, payment(dec!(1))).await,
            Err(LoanError::NotAcceptingPayments(LoanStatus::Completed))
        ));
    }

    #[tokio::test]
    async fn test_payment_after_due_date_is_late() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        let loan = service_at(start(), store.clone())
            .apply_loan(user_id, application(dec!(1200), 2))
            .await
            .unwrap();
        service_at(start(), store.clone())
            .approve_loan(loan.id, Uuid::new_v4())
            .await
            .unwrap();

        let overdue = start() + Duration::days(45);
        let detail = service_at(overdue, store)
            .record_payment(user_id, loan.id, payment(loan.monthly_payment))
            .await
            .unwrap();

        assert_eq!(
            detail.loan.repayment_schedule[0].status,
            InstallmentStatus::Late
        );
        assert_eq!(detail.loan.payment_history[0].status, PaymentStatus::Late);
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let user_id = Uuid::new_v4();
        let loan = service
            .apply_loan(user_id, application(dec!(1200), 2))
            .await
            .unwrap();
        service.approve_loan(loan.id, Uuid::new_v4()).await.unwrap();

        assert!(matches!(
            service
                .record_payment(user_id, loan.id, payment(loan.total_repayment + dec!(1)))
                .await,
            Err(LoanError::Overpayment { .. })
        ));
    }

    /// Store whose loan reads stall, so concurrent writers read the same
    /// version before either one writes
    struct SlowReadStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl LoanStore for SlowReadStore {
        async fn insert_loan(&self, loan: &Loan) -> Result<(), StoreError> {
            self.inner.insert_loan(loan).await
        }

        async fn update_loan(&self, loan: &Loan) -> Result<(), StoreError> {
            self.inner.update_loan(loan).await
        }

        async fn find_loan(&self, id: Uuid) -> Result<Option<Loan>, StoreError> {
            let loan = self.inner.find_loan(id).await;
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            loan
        }

        async fn find_loans_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>, StoreError> {
            self.inner.find_loans_by_user(user_id).await
        }

        async fn list_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>, StoreError> {
            self.inner.list_loans(status).await
        }
    }

    #[async_trait]
    impl UserStore for SlowReadStore {
        async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
            self.inner.insert_user(user).await
        }

        async fn update_user(&self, user: &User) -> Result<(), StoreError> {
            self.inner.update_user(user).await
        }

        async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.inner.find_user(id).await
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.inner.find_user_by_email(email).await
        }
    }

    #[async_trait]
    impl Store for SlowReadStore {
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn slow_service() -> LoanService {
        let store = Arc::new(SlowReadStore {
            inner: MemoryStore::new(),
        });
        LoanService::new(store, Arc::new(FixedClock(start())))
    }

    #[tokio::test]
    async fn test_concurrent_payments_are_both_recorded() {
        let service = slow_service();
        let user_id = Uuid::new_v4();
        let loan = service
            .apply_loan(user_id, application(dec!(1200), 2))
            .await
            .unwrap();
        service.approve_loan(loan.id, Uuid::new_v4()).await.unwrap();

        let (a, b) = tokio::join!(
            service.record_payment(user_id, loan.id, payment(dec!(100))),
            service.record_payment(user_id, loan.id, payment(dec!(100))),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());

        let detail = service.get_loan(user_id, loan.id).await.unwrap();
        assert_eq!(detail.loan.payment_history.len(), 2);
        assert_eq!(detail.loan.repayment_schedule[0].amount_paid, dec!(200));
        assert_eq!(detail.loan.version, 3);
    }

    #[tokio::test]
    async fn test_concurrent_review_has_one_winner() {
        let service = slow_service();
        let loan = service
            .apply_loan(Uuid::new_v4(), application(dec!(5000), 6))
            .await
            .unwrap();

        let reviewer = Uuid::new_v4();
        let (approved, rejected) = tokio::join!(
            service.approve_loan(loan.id, reviewer),
            service.reject_loan(loan.id, reviewer, "duplicate".to_string()),
        );

        assert!(approved.is_ok() != rejected.is_ok());
        let loser = if approved.is_ok() {
            rejected.map(|_| ())
        } else {
            approved.map(|_| ())
        };
        assert!(matches!(loser, Err(LoanError::NotPending(_))));
    }

    #[tokio::test]
    async fn test_credit_report_requires_user() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.credit_report(Uuid::new_v4()).await,
            Err(LoanError::UserNotFound)
        ));
    }

    #[test]
    fn test_quote_uses_resolved_rate() {
        let service = service_at(start(), Arc::new(MemoryStore::new()));
        let quote = service.quote(&QuoteQuery {
            principal: dec!(12000),
            term_months: 12,
            interest_rate: None,
            lender_name: Some("Standard Bank".to_string()),
        });

        assert_eq!(quote.interest_rate, dec!(8.5));
        assert_eq!(quote.monthly_payment, dec!(1046.64));
        assert_eq!(quote.total_interest, dec!(559.68));
        assert_eq!(quote.repayment_schedule.len(), 12);
    }
}
