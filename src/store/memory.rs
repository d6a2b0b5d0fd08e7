use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LoanStore, Store, StoreError, UserStore};
use crate::loan::{Loan, LoanStatus};
use crate::models::User;

/// In-process store backed by hash maps
#[derive(Default)]
pub struct MemoryStore {
    loans: RwLock<HashMap<Uuid, Loan>>,
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn insert_loan(&self, loan: &Loan) -> Result<(), StoreError> {
        let mut loans = self.loans.write().await;
        if loans.contains_key(&loan.id) {
            return Err(StoreError::Conflict(format!("loan {} already exists", loan.id)));
        }
        loans.insert(loan.id, loan.clone());
        Ok(())
    }

    async fn update_loan(&self, loan: &Loan) -> Result<(), StoreError> {
        let mut loans = self.loans.write().await;
        match loans.get_mut(&loan.id) {
            Some(existing) if existing.version != loan.version => Err(StoreError::Stale),
            Some(existing) => {
                *existing = loan.clone();
                existing.version += 1;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_loan(&self, id: Uuid) -> Result<Option<Loan>, StoreError> {
        Ok(self.loans.read().await.get(&id).cloned())
    }

    async fn find_loans_by_user(&self, user_id: Uuid) -> Result<Vec<Loan>, StoreError> {
        let mut loans: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.created_at);
        Ok(loans)
    }

    async fn list_loans(&self, status: Option<LoanStatus>) -> Result<Vec<Loan>, StoreError> {
        let mut loans: Vec<Loan> = self
            .loans
            .read()
            .await
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(loans)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
