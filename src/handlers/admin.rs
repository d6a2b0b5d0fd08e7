//! Staff and admin handlers
//!
//! Loan review, direct status changes, credit lookups for any borrower and
//! staff account creation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{AdminUser, StaffUser};
use crate::error::ApiError;
use crate::loan::{LoanDetail, ListLoansQuery, RejectLoanRequest, UpdateLoanStatusRequest};
use crate::middleware::{ValidatedJson, ValidatedQuery};
use crate::models::{ApiResponse, CreateStaffRequest, UserResponse};
use crate::services::CreditReport;
use crate::state::AppState;

/// GET /api/admin/loans?status=
pub async fn list_loans(
    State(state): State<AppState>,
    _staff: StaffUser,
    ValidatedQuery(query): ValidatedQuery<ListLoansQuery>,
) -> Result<Json<ApiResponse<Vec<LoanDetail>>>, ApiError> {
    let loans = state.loan_service.list_all_loans(query.status).await?;
    Ok(Json(ApiResponse::ok(loans)))
}

/// POST /api/admin/loans/:id/approve
pub async fn approve_loan(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanDetail>>, ApiError> {
    let loan = state.loan_service.approve_loan(id, staff.user_id).await?;
    Ok(Json(ApiResponse::ok(loan)))
}

/// POST /api/admin/loans/:id/reject
pub async fn reject_loan(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RejectLoanRequest>,
) -> Result<Json<ApiResponse<LoanDetail>>, ApiError> {
    let loan = state
        .loan_service
        .reject_loan(id, staff.user_id, req.reason)
        .await?;
    Ok(Json(ApiResponse::ok(loan)))
}

/// PUT /api/admin/loans/:id/status
pub async fn update_loan_status(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateLoanStatusRequest>,
) -> Result<Json<ApiResponse<LoanDetail>>, ApiError> {
    let loan = state.loan_service.update_status(id, req.status).await?;
    Ok(Json(ApiResponse::ok(loan)))
}

/// GET /api/admin/users/:id/credit-report
pub async fn get_user_credit_report(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CreditReport>>, ApiError> {
    let report = state.loan_service.credit_report(user_id).await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// POST /api/admin/staff - Admin only
pub async fn create_staff(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidatedJson(req): ValidatedJson<CreateStaffRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user = state.auth_service.create_staff(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user.into()))))
}
