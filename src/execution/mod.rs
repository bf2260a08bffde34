//! Order execution module
//!
//! Atomic two-leg placement: the entry and its protective stop go out as a
//! single logical transaction, and a half-placed pair is never allowed to
//! survive the call that created it.

mod coordinator;
mod types;

pub use coordinator::{submit_confirmed, OrderCoordinator};
pub use types::{BrokerOrder, LinkedOrderPair, PairError, PlacementFailure};
