//! Staff and admin routes

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::admin;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/loans", get(admin::list_loans))
        .route("/api/admin/loans/:id/approve", post(admin::approve_loan))
        .route("/api/admin/loans/:id/reject", post(admin::reject_loan))
        .route("/api/admin/loans/:id/status", put(admin::update_loan_status))
        .route(
            "/api/admin/users/:id/credit-report",
            get(admin::get_user_credit_report),
        )
        .route("/api/admin/staff", post(admin::create_staff))
}
