//! Live trade monitor module
//!
//! Tick-driven supervision of open positions: prioritized exit triggers and
//! trailing-stop maintenance. CPU-only; close submissions belong to the
//! emergency path.

mod triggers;

pub use triggers::{on_tick, TickOutcome};
