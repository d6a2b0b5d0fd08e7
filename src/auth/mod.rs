//! Authentication module for LendWise
//!
//! Email/password authentication for borrowers and staff.
//! - bcrypt password hashing
//! - JWT access token generation and validation

mod jwt;
mod password;
mod service;

pub use jwt::{generate_access_token, get_user_id_from_claims, verify_token, Claims, JwtError};
pub use password::{hash_password, verify_password};
pub use service::{AuthError, AuthService};
