use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{LoanStore, Store, StoreError, UserStore};
use crate::config::Config;
use crate::loan::{
    Installment, Loan, LoanPurpose, LoanStatus, LoanType, PaymentRecord,
};
use crate::models::{EmploymentStatus, User};

const LOAN_COLUMNS: &str = r#"
    id, user_id, loan_amount, loan_purpose, loan_type, term_months, interest_rate,
    lender_name, credit_limit, collateral, employment_status, monthly_income, status,
    monthly_payment, total_repayment, repayment_schedule, payment_history,
    approved_by, approved_at, rejection_reason, version, created_at, updated_at
"#;

const USER_COLUMNS: &str = r#"
    id, email, password_hash, full_name, role, employment_status, annual_income,
    created_at, updated_at
"#;

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Open the connection pool and bring the schema up to date
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        tracing::info!("Connecting to database at {}", config.database_url_masked());

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {}", e)))?;

        tracing::info!("Database connected and migrated");

        Ok(Self::new(db_pool))
    }
}

/// Row shape of the `loans` table
#[derive(sqlx::FromRow)]
struct LoanRow {
    id: Uuid,
    user_id: Uuid,
    loan_amount: Decimal,
    loan_purpose: LoanPurpose,
    loan_type: LoanType,
    term_months: i32,
    interest_rate: Decimal,
    lender_name: Option<String>,
    credit_limit: Option<Decimal>,
    collateral: Option<String>,
    employment_status: EmploymentStatus,
    monthly_income: Decimal,
    status: LoanStatus,
    monthly_payment: Decimal,
    total_repayment: Decimal,
    repayment_schedule: Json<Vec<Installment>>,
    payment_history: Json<Vec<PaymentRecord>>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LoanRow> for Loan {
    fn from(row: LoanRow) -> Self {
        Loan {
            id: row.id,
            user_id: row.user_id,
            loan_amount: row.loan_amount,
            loan_purpose: row.loan_purpose,
            loan_type: row.loan_type,
            term_months: row.term_months.max(0) as u32,
            interest_rate: row.interest_rate,
            lender_name: row.lender_name,
            credit_limit: row.credit_limit,
            collateral: row.collateral,
            employment_status: row.employment_status,
            monthly_income: row.monthly_income,
            status: row.status,
            monthly_payment: row.monthly_payment,
            total_repayment: row.total_repayment,
            repayment_schedule: row.repayment_schedule.0,
            payment_history: row.payment_history.0,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl LoanStore for PgStore {
    async fn insert_loan(&self, loan: &Loan) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                id, user_id, loan_amount, loan_purpose, loan_type, term_months, interest_rate,
                lender_name, credit_limit, collateral, employment_status, monthly_income, status,
                monthly_payment, total_repayment, repayment_schedule, payment_history,
                approved_by, approved_at, rejection_reason, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23)
            "#,
        )
        .bind(loan.id)
        .bind(loan.user_id)
        .bind(loan.loan_amount)
        .bind(loan.loan_purpose)
        .bind(loan.loan_type)
        .bind(loan.term_months as i32)
        .bind(loan.interest_rate)
        .bind(&loan.lender_name)
        .bind(loan.credit_limit)
        .bind(&loan.collateral)
        .bind(loan.employment_status)
        .bind(loan.monthly_income)
        .bind(loan.status)
        .bind(loan.monthly_payment)
        .bind(loan.total_repayment)
        .bind(Json(&loan.repayment_schedule))
        .bind(Json(&loan.payment_history))
        .bind(loan.approved_by)
        .bind(loan.approved_at)
        .bind(&loan.rejection_reason)
        .bind(loan.version)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn update_loan(&self, loan: &Loan) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE loans
            SET status = $1, repayment_schedule = $2, payment_history = $3,
                approved_by = $4, approved_at = $5, rejection_reason = $6, updated_at = $7,
                version = version + 1
            WHERE id = $8 AND version = $9
            "#,
        )
        .bind(loan.status)
        .bind(Json(&loan.repayment_schedule))
        .bind(Json(&loan.payment_history))
        .bind(loan.approved_by)
        .bind(loan.approved_at)
        .bind(&loan.rejection_reason)
        .bind(loan.updated_at)
        .bind(loan.id)
        .bind(loan.version)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if rows_affected > 0 {
            return Ok(());
        }

        // Nothing matched: either the loan is gone or its version moved on
        let stored_version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM loans WHERE id = $1")
                .bind(loan.id)
                .fetch_optional(&self.db_pool)
                .await?;

        match stored_version {
            Some(_) => Err(StoreError::Stale),
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_loan(&self, id: Uuid) -> Result<Option<Loan>, StoreError> {
        let row = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans WHERE id = $1",
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.map(Loan::from))
    }

    async fn find_loans_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>, StoreError> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans WHERE user_id = $1 ORDER BY created_at ASC",
            LOAN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    async fn list_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>, StoreError> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans WHERE ($1::loan_status IS NULL OR status = $1) ORDER BY created_at DESC",
            LOAN_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role, employment_status, annual_income, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.employment_status)
        .bind(user.annual_income)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $1, employment_status = $2, annual_income = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(&user.full_name)
        .bind(user.employment_status)
        .bind(user.annual_income)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(())
    }
}
