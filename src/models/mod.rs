//! Data models for LendWise backend

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// User model
#[derive(Debug, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: UserRole,
    pub employment_status: Option<EmploymentStatus>,
    pub annual_income: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            employment_status: user.employment_status,
            annual_income: user.annual_income,
            created_at: user.created_at,
        }
    }
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Borrower,
    Staff,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Borrower => "borrower",
            UserRole::Staff => "staff",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "borrower" => Some(UserRole::Borrower),
            "staff" => Some(UserRole::Staff),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Staff and admins may act on other users' loans
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Staff | UserRole::Admin)
    }
}

/// Employment status captured on profiles and applications
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "employment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Employed,
    SelfEmployed,
    Unemployed,
    Student,
    Retired,
}

/// Profile inputs carried alongside a credit report.
///
/// The score does not read these yet.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BorrowerProfile {
    pub user_id: Uuid,
    pub employment_status: Option<EmploymentStatus>,
    pub annual_income: Option<Decimal>,
}

impl From<&User> for BorrowerProfile {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            employment_status: user.employment_status,
            annual_income: user.annual_income,
        }
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [UserRole::Borrower, UserRole::Staff, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("oracle"), None);
    }

    #[test]
    fn test_staff_roles() {
        assert!(!UserRole::Borrower.is_staff());
        assert!(UserRole::Staff.is_staff());
        assert!(UserRole::Admin.is_staff());
    }
}
