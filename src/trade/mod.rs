//! Trade state module
//!
//! Live position records, the slot table they live in, and the durable
//! closed-trade journal.

mod book;
mod journal;
mod types;

pub use book::{ReserveError, TradeBook};
pub use journal::TradeJournal;
pub use types::{
    ActiveTrade, ClosedTrade, ExitReason, ForcedTrigger, KillSwitchReason, StructuralTrigger,
    TradeId, TradeStateError, TradeStatus,
};
