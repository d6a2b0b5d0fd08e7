//! Credit report routes

use axum::{routing::get, Router};

use crate::handlers::credit;
use crate::state::AppState;

pub fn credit_routes() -> Router<AppState> {
    Router::new().route("/api/credit/report", get(credit::get_credit_report))
}
