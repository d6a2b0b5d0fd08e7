//! Middleware for the LendWise API
//!
//! Request tracing, security headers, authentication extractors and
//! validating body/query extractors.

pub mod auth;
mod security;
mod tracing;
mod validation;

pub use auth::{AdminUser, AuthenticatedUser, StaffUser};
pub use security::{hsts_header, security_headers};
pub use self::tracing::request_tracing;
pub use validation::{ValidatedJson, ValidatedQuery};
