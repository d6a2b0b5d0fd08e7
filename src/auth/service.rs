//! Authentication service
//!
//! Registration, login and account management for borrowers and staff.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{
    AuthTokensResponse, CreateStaffRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
    User, UserRole,
};
use crate::store::{Store, StoreError};

use super::jwt::{generate_access_token, verify_token, Claims, JwtError};
use super::password::{hash_password, verify_password};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Staff accounts must have the staff or admin role")]
    InvalidStaffRole,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AuthError::EmailTaken,
            other => AuthError::Store(other),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::TokenError(e.to_string())
    }
}

/// Checked against when a login names an unknown email, so that path costs
/// one bcrypt verification like any other failed login
const DUMMY_PASSWORD: &str = "lendwise-unknown-account";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    bcrypt_cost: u32,
    dummy_hash: String,
}

impl AuthService {
    /// Fails only if `bcrypt_cost` is outside what bcrypt accepts
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        bcrypt_cost: u32,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hash_password(DUMMY_PASSWORD, bcrypt_cost)?;
        Ok(Self {
            store,
            clock,
            jwt_secret,
            access_token_ttl_seconds,
            bcrypt_cost,
            dummy_hash,
        })
    }

    /// Register a borrower and issue a token
    pub async fn register_borrower(
        &self,
        request: RegisterRequest,
    ) -> Result<AuthTokensResponse, AuthError> {
        let mut user = self
            .new_user(
                &request.email,
                &request.password,
                request.full_name,
                UserRole::Borrower,
            )
            .await?;
        user.employment_status = request.employment_status;
        user.annual_income = request.annual_income;

        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "Borrower registered");

        self.issue_tokens(user)
    }

    /// Verify credentials and issue a token
    pub async fn login(&self, request: LoginRequest) -> Result<AuthTokensResponse, AuthError> {
        let user = self.store.find_user_by_email(&request.email).await?;

        let password_hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let password = request.password;
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
                .await
                .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let user = match user {
            Some(user) if verified => user,
            Some(user) => {
                tracing::warn!(user_id = %user.id, "Failed login attempt");
                return Err(AuthError::InvalidCredentials);
            }
            None => return Err(AuthError::InvalidCredentials),
        };

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");

        self.issue_tokens(user)
    }

    /// Create a staff or admin account
    pub async fn create_staff(&self, request: CreateStaffRequest) -> Result<User, AuthError> {
        if !request.role.is_staff() {
            return Err(AuthError::InvalidStaffRole);
        }

        let user = self
            .new_user(
                &request.email,
                &request.password,
                request.full_name,
                request.role,
            )
            .await?;
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Staff account created");

        Ok(user)
    }

    /// Create the configured admin account unless the email already exists
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Ok(());
        }

        let user = self
            .new_user(email, password, "Administrator".to_string(), UserRole::Admin)
            .await?;
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, "Bootstrap admin account created");

        Ok(())
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let mut user = self.get_user_by_id(user_id).await?;

        if let Some(full_name) = request.full_name {
            user.full_name = full_name;
        }
        if request.employment_status.is_some() {
            user.employment_status = request.employment_status;
        }
        if request.annual_income.is_some() {
            user.annual_income = request.annual_income;
        }
        user.updated_at = self.clock.now();

        self.store.update_user(&user).await?;

        Ok(user)
    }

    /// Decode an access token
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        verify_token(token, &self.jwt_secret)
    }

    async fn new_user(
        &self,
        email: &str,
        password: &str,
        full_name: String,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        // bcrypt is CPU bound; keep it off the async workers
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))??;

        let now = self.clock.now();
        Ok(User {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            password_hash,
            full_name,
            role,
            employment_status: None,
            annual_income: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn issue_tokens(&self, user: User) -> Result<AuthTokensResponse, AuthError> {
        let jti = Uuid::new_v4().to_string();
        let access_token =
            generate_access_token(&user, &jti, &self.jwt_secret, self.access_token_ttl_seconds)?;

        Ok(AuthTokensResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            user: user.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::EmploymentStatus;
    use crate::store::MemoryStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn registered_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn service_with(store: Arc<MemoryStore>, now: DateTime<Utc>) -> AuthService {
        AuthService::new(store, Arc::new(FixedClock(now)), "test-secret".to_string(), 900, 4)
            .unwrap()
    }

    fn service() -> AuthService {
        service_with(Arc::new(MemoryStore::new()), registered_at())
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            full_name: "Ada Borrower".to_string(),
            employment_status: None,
            annual_income: Some(Decimal::from(60_000)),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let registered = service
            .register_borrower(registration("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(registered.user.role, UserRole::Borrower);

        let logged_in = service
            .login(LoginRequest {
                email: "ADA@example.com".to_string(),
                password: "correct horse battery".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let claims = service.verify_access_token(&logged_in.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let service = service();
        service
            .register_borrower(registration("ada@example.com"))
            .await
            .unwrap();
        let result = service
            .register_borrower(registration("ada@example.com"))
            .await;
        assert!(matches!(result, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let service = service();
        service
            .register_borrower(registration("ada@example.com"))
            .await
            .unwrap();
        let result = service
            .login(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "wrong password".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_create_staff_requires_staff_role() {
        let service = service();
        let result = service
            .create_staff(CreateStaffRequest {
                email: "clerk@example.com".to_string(),
                password: "correct horse battery".to_string(),
                full_name: "Loan Clerk".to_string(),
                role: UserRole::Borrower,
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidStaffRole)));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let service = service();
        service
            .ensure_admin("admin@example.com", "admin password")
            .await
            .unwrap();
        service
            .ensure_admin("admin@example.com", "admin password")
            .await
            .unwrap();

        let admin = service
            .login(LoginRequest {
                email: "admin@example.com".to_string(),
                password: "admin password".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(admin.user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let service = service();
        let result = service
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "lendwise-unknown-account".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn test_invalid_bcrypt_cost_is_rejected() {
        let result = AuthService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock(registered_at())),
            "test-secret".to_string(),
            900,
            2,
        );
        assert!(matches!(result, Err(AuthError::Hashing(_))));
    }

    #[tokio::test]
    async fn test_timestamps_come_from_clock() {
        let store = Arc::new(MemoryStore::new());
        let registered = service_with(store.clone(), registered_at())
            .register_borrower(registration("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(registered.user.created_at, registered_at());

        let later = registered_at() + Duration::days(3);
        let updated = service_with(store, later)
            .update_profile(
                registered.user.id,
                UpdateProfileRequest {
                    full_name: None,
                    employment_status: Some(EmploymentStatus::Retired),
                    annual_income: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.created_at, registered_at());
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.employment_status, Some(EmploymentStatus::Retired));
        assert_eq!(updated.annual_income, Some(Decimal::from(60_000)));
    }
}
