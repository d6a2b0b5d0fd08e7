//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::loan_service::LoanService;
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub loan_service: Arc<LoanService>,
    pub auth_service: Arc<AuthService>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(
        loan_service: Arc<LoanService>,
        auth_service: Arc<AuthService>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            loan_service,
            auth_service,
            store,
        }
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}
