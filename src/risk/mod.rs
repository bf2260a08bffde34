//! Risk management module
//!
//! Day-scoped risk ledger, pre-trade admission gate, and pure position
//! sizing / price calculation.

mod gate;
mod ledger;
mod sizing;
mod types;

pub use gate::{Admission, SafetyGate, SlotState};
pub use ledger::{LockReason, LockState, RiskLedger};
pub use sizing::{compute_stop, compute_target, size_position};
pub use types::{RejectReason, SizingError};
