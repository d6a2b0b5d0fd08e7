//! Pure computation engines for LendWise
//!
//! Neither engine touches storage; `crate::loan_service` feeds them.

pub mod amortization;
pub mod credit_score;

pub use credit_score::{CreditReport, ScoreBand};
