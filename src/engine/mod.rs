//! Orchestrator module
//!
//! The public façade composing the gate, sizer, coordinator, monitor,
//! emergency path, and risk ledger into one trade lifecycle.

mod orchestrator;
mod types;

pub use orchestrator::Engine;
pub use types::{ActiveSummary, ClosedSummary, EnterError, PositionSummary, RiskStatus};
