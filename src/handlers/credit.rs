//! Credit report handlers

use axum::{extract::State, Json};

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::services::CreditReport;
use crate::state::AppState;

/// GET /api/credit/report - Report for the caller
pub async fn get_credit_report(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<CreditReport>>, ApiError> {
    let report = state.loan_service.credit_report(user.user_id).await?;
    Ok(Json(ApiResponse::ok(report)))
}
