//! Document store access for loans and users
//!
//! Services only see the [`Store`] trait. `PgStore` persists to Postgres with
//! schedules and histories kept as JSONB documents; `MemoryStore` keeps
//! everything in process for tests and local runs.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::loan::{Loan, LoanStatus};
use crate::models::User;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage failures, surfaced to callers as a generic unavailable condition
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record conflict: {0}")]
    Conflict(String),

    /// The record changed after it was read
    #[error("record was modified by another request")]
    Stale,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn insert_loan(&self, loan: &Loan) -> Result<(), StoreError>;

    /// Overwrite a loan whose stored version still equals `loan.version`,
    /// then bump the stored version. `Stale` if another write got there
    /// first, `NotFound` if the id is unknown.
    async fn update_loan(&self, loan: &Loan) -> Result<(), StoreError>;

    async fn find_loan(&self, id: Uuid) -> Result<Option<Loan>, StoreError>;

    /// All loans owned by one user, oldest first
    async fn find_loans_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>, StoreError>;

    /// All loans, newest first, optionally filtered by status
    async fn list_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Conflict` when the email is already registered
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Full storage collaborator shared through application state
#[async_trait]
pub trait Store: LoanStore + UserStore {
    /// Connectivity check behind the health endpoint
    async fn ping(&self) -> Result<(), StoreError>;
}
