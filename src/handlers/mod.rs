//! API handlers for LendWise

pub mod admin;
pub mod auth;
pub mod credit;
pub mod loan;
pub mod user;

// Re-export the principal extractors for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, StaffUser};
