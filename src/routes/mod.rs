//! Route definitions for the LendWise API

mod admin;
mod auth;
mod credit;
mod loan;
mod user;

pub use admin::admin_routes;
pub use auth::auth_routes;
pub use credit::credit_routes;
pub use loan::loan_routes;
pub use user::user_routes;
