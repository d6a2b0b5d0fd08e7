//! User profile handlers

use axum::{extract::State, Json};

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::middleware::ValidatedJson;
use crate::models::{ApiResponse, UpdateProfileRequest, UserResponse};
use crate::state::AppState;

/// PUT /api/users/me - Update the caller's profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let updated = state.auth_service.update_profile(user.user_id, req).await?;
    Ok(Json(ApiResponse::ok(updated.into())))
}
