//! Authentication models for LendWise

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::{EmploymentStatus, UserRole};

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Borrower self-registration
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    pub employment_status: Option<EmploymentStatus>,
    #[validate(custom = "crate::loan::validate_money")]
    pub annual_income: Option<Decimal>,
}

/// Email/password login for any principal
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Admin request to create a staff account
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    pub role: UserRole,
}

/// Profile fields a user may change on their own account
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    pub employment_status: Option<EmploymentStatus>,
    #[validate(custom = "crate::loan::validate_money")]
    pub annual_income: Option<Decimal>,
}

/// Auth tokens response
#[derive(Debug, Serialize)]
pub struct AuthTokensResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub employment_status: Option<EmploymentStatus>,
    pub annual_income: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_rejects_bad_email() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "correct horse".to_string(),
            full_name: "Ada Borrower".to_string(),
            employment_status: None,
            annual_income: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_rejects_short_password() {
        let request = RegisterRequest {
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
            full_name: "Ada Borrower".to_string(),
            employment_status: Some(EmploymentStatus::Employed),
            annual_income: Some(Decimal::from(52_000)),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_profile_update_rejects_negative_income() {
        let request = UpdateProfileRequest {
            full_name: None,
            employment_status: None,
            annual_income: Some(Decimal::from(-1)),
        };
        assert!(request.validate().is_err());
    }
}
