//! Borrower loan handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::loan::{ApplyLoanRequest, LoanDetail, QuoteQuery, QuoteResponse, RecordPaymentRequest};
use crate::middleware::{ValidatedJson, ValidatedQuery};
use crate::models::ApiResponse;
use crate::state::AppState;

/// POST /api/loans - Submit a loan application
pub async fn apply_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<ApplyLoanRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoanDetail>>), ApiError> {
    let loan = state.loan_service.apply_loan(user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(loan.detail()))))
}

/// GET /api/loans - The caller's loans
pub async fn list_loans(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<LoanDetail>>>, ApiError> {
    let loans = state.loan_service.list_loans(user.user_id).await?;
    Ok(Json(ApiResponse::ok(loans)))
}

/// GET /api/loans/:id
pub async fn get_loan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanDetail>>, ApiError> {
    let loan = state.loan_service.get_loan(user.user_id, id).await?;
    Ok(Json(ApiResponse::ok(loan)))
}

/// POST /api/loans/:id/payments
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RecordPaymentRequest>,
) -> Result<Json<ApiResponse<LoanDetail>>, ApiError> {
    let loan = state
        .loan_service
        .record_payment(user.user_id, id, req)
        .await?;
    Ok(Json(ApiResponse::ok(loan)))
}

/// GET /api/loans/quote
pub async fn quote(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<QuoteQuery>,
) -> Json<ApiResponse<QuoteResponse>> {
    Json(ApiResponse::ok(state.loan_service.quote(&query)))
}
