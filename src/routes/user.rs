//! User profile routes

use axum::{routing::put, Router};

use crate::handlers::user;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/api/users/me", put(user::update_profile))
}
