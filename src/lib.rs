//! LendWise Backend Library
//!
//! Loan applications, amortized repayment schedules, payment recording and
//! credit scoring behind an axum JSON API.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod loan_service;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use state::AppState;

/// Assemble the API router with tracing and security headers applied.
///
/// CORS and HSTS depend on deployment config and are layered on by the
/// binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::auth_routes())
        .merge(routes::user_routes())
        .merge(routes::loan_routes())
        .merge(routes::credit_routes())
        .merge(routes::admin_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}

async fn root() -> &'static str {
    "LendWise API Server"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: String,
    version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, database) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "connected".to_string()),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            format!("error: {}", e),
        ),
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
