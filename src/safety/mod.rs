//! Emergency exit and circuit breaker module
//!
//! The paths that run when something has already gone wrong: force-closing
//! a position with bounded retries, and tripping a breaker on repeated
//! coordinator/broker failures so the kill switch fires without a human.

mod breaker;
mod emergency;

pub use breaker::CircuitBreaker;
pub use emergency::{EmergencyExit, ExitFailure};
