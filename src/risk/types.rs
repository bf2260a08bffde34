//! Risk management types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position sizing errors
///
/// Invalid inputs are rejected at the call site, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SizingError {
    /// Risk budget cannot cover one lot at the given stop distance
    #[error("risk budget too small for minimum lot")]
    RiskBudgetTooSmall,
    /// Risk amount must be positive
    #[error("risk amount must be positive")]
    NonPositiveRisk,
    /// Entry and stop must differ
    #[error("entry and stop prices must differ")]
    ZeroStopDistance,
    /// Prices must be positive
    #[error("prices must be positive")]
    NonPositivePrice,
}

/// Why the safety gate refused a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Outside the trading session
    MarketClosed,
    /// Signal direction is hold, or the signal is malformed
    NoTradeSignal,
    /// Signal confidence below the configured minimum
    LowConfidence,
    /// Every position slot is occupied
    SlotOccupied,
    /// A live position already holds this instrument
    ConflictingPosition,
    /// Risk ledger is locked or the day-trade cap is reached
    RiskLimitReached,
    /// Post-loss cooldown is active
    InCooldown,
    /// Market data is missing, stale, or the spread is too wide
    UnhealthyMarketData,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MarketClosed => write!(f, "market closed"),
            RejectReason::NoTradeSignal => write!(f, "signal does not request a trade"),
            RejectReason::LowConfidence => write!(f, "signal confidence below threshold"),
            RejectReason::SlotOccupied => write!(f, "no free position slot"),
            RejectReason::ConflictingPosition => write!(f, "conflicting position already open"),
            RejectReason::RiskLimitReached => write!(f, "risk limit reached"),
            RejectReason::InCooldown => write!(f, "cooldown active after loss"),
            RejectReason::UnhealthyMarketData => write!(f, "market data unhealthy"),
        }
    }
}
