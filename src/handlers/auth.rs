//! Authentication HTTP handlers
//!
//! Email/password registration and login.

use axum::{extract::State, http::StatusCode, Json};

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::middleware::ValidatedJson;
use crate::models::{AuthTokensResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::state::AppState;

/// POST /auth/register - Create a borrower account and issue a token
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthTokensResponse>), ApiError> {
    let tokens = state.auth_service.register_borrower(req).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

/// POST /auth/login - Exchange credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthTokensResponse>, ApiError> {
    let tokens = state.auth_service.login(req).await?;
    Ok(Json(tokens))
}

/// GET /auth/me - Get current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.get_user_by_id(user.user_id).await?;
    Ok(Json(user.into()))
}
