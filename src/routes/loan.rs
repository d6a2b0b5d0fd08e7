//! Borrower loan routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::loan;
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", post(loan::apply_loan).get(loan::list_loans))
        .route("/api/loans/quote", get(loan::quote))
        .route("/api/loans/:id", get(loan::get_loan))
        .route("/api/loans/:id/payments", post(loan::record_payment))
}
