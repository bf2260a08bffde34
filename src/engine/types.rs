//! Orchestrator surface types

use crate::execution::PlacementFailure;
use crate::risk::{RejectReason, SizingError};
use crate::signal::Direction;
use crate::trade::{ActiveTrade, TradeId, TradeStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Why an entry attempt produced no trade
#[derive(Debug, Error)]
pub enum EnterError {
    /// The circuit breaker is open; no new trades
    #[error("circuit breaker open")]
    CircuitOpen,
    /// The safety gate refused the signal
    #[error("rejected: {0}")]
    Rejected(RejectReason),
    /// Sizing refused the risk parameters
    #[error("sizing rejected: {0}")]
    Sizing(SizingError),
    /// Order placement failed
    #[error("placement failed: {0}")]
    Placement(PlacementFailure),
}

/// One open position, as reported
#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    pub trade_id: TradeId,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub quantity: u32,
    pub stop_price: Decimal,
    pub target_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub status: TradeStatus,
}

impl From<&ActiveTrade> for PositionSummary {
    fn from(trade: &ActiveTrade) -> Self {
        Self {
            trade_id: trade.id,
            instrument: trade.instrument.clone(),
            direction: trade.direction,
            entry_price: trade.entry_price,
            quantity: trade.quantity,
            stop_price: trade.stop_price,
            target_price: trade.target_price,
            unrealized_pnl: trade.unrealized_pnl,
            status: trade.status(),
        }
    }
}

/// Open-position summary
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSummary {
    pub count: usize,
    pub total_unrealized_pnl: Decimal,
    pub positions: Vec<PositionSummary>,
}

/// Closed-trade summary
#[derive(Debug, Clone, Serialize)]
pub struct ClosedSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
}

/// Risk ledger status report
#[derive(Debug, Clone, Serialize)]
pub struct RiskStatus {
    pub can_trade: bool,
    pub trades_today: u32,
    pub consecutive_losses: u32,
    pub daily_loss: Decimal,
    pub daily_pnl: Decimal,
    pub locked_until: Option<DateTime<Utc>>,
}
