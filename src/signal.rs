//! Trade signal types
//!
//! The upstream decision engine emits these; the engine consumes them as
//! opaque inputs and never second-guesses the direction call.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Directional bias of a trade signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Buy a call-side position
    Long,
    /// Buy a put-side position
    Short,
    /// No trade
    Hold,
}

impl Direction {
    /// True for directions that request a position
    pub fn is_tradeable(&self) -> bool {
        !matches!(self, Direction::Hold)
    }
}

/// A directional trade recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Instrument to trade (option contract identifier)
    pub instrument: String,
    /// Trade direction
    pub direction: Direction,
    /// Suggested entry premium
    pub entry_price: Decimal,
    /// Structural reference level for stop placement (e.g. a delta-flip price)
    pub structural_reference: Option<Decimal>,
    /// Upstream confidence score in [0, 1]
    pub confidence: Decimal,
    /// Signal generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl TradeSignal {
    /// Create a new signal stamped now
    pub fn new(
        instrument: impl Into<String>,
        direction: Direction,
        entry_price: Decimal,
        structural_reference: Option<Decimal>,
        confidence: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            direction,
            entry_price,
            structural_reference,
            confidence,
            timestamp: Utc::now(),
        }
    }
}
