//! Trade lifecycle types

use crate::broker::OrderId;
use crate::execution::LinkedOrderPair;
use crate::signal::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Trade identifier
pub type TradeId = Uuid;

/// Position lifecycle status
///
/// Transitions are strictly monotonic: `EntryPending → Monitoring →
/// ExitPending → Exited`. Reversals are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Legs placed, entry confirmation in flight
    EntryPending,
    /// Position live and supervised by the monitor
    Monitoring,
    /// Exit requested, close submission in flight
    ExitPending,
    /// Closed (terminal)
    Exited,
}

/// Rejected status transition
#[derive(Debug, Clone, Copy, Error)]
#[error("invalid trade status transition: {from:?} -> {to:?}")]
pub struct TradeStateError {
    pub from: TradeStatus,
    pub to: TradeStatus,
}

/// Why the kill switch fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillSwitchReason {
    /// Manual operator override
    Manual,
    /// Circuit breaker tripped on repeated failures
    CircuitBreaker,
    /// An emergency exit could not confirm closure
    FatalExit,
}

impl std::fmt::Display for KillSwitchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KillSwitchReason::Manual => write!(f, "manual override"),
            KillSwitchReason::CircuitBreaker => write!(f, "circuit breaker tripped"),
            KillSwitchReason::FatalExit => write!(f, "unconfirmed emergency exit"),
        }
    }
}

/// Structural invalidation triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralTrigger {
    /// Delta crossed against the position direction
    DeltaFlip,
    /// Gamma fell below the exhaustion floor
    GammaExhaustion,
    /// Theta decay accelerated beyond the ceiling
    ThetaSpike,
}

/// Forced-exit triggers, independent of trade economics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcedTrigger {
    /// Market data older than the staleness timeout
    StaleData,
    /// Bid/ask spread beyond the configured maximum
    SpreadTooWide,
    /// Session force-exit time reached
    MarketClose,
}

/// Why a trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Target price reached
    Target,
    /// Stop price reached
    StopLoss,
    /// Market structure invalidated the position
    Structural(StructuralTrigger),
    /// Forced exit on data quality or session boundary
    Forced(ForcedTrigger),
    /// Kill switch flattened the book
    KillSwitch(KillSwitchReason),
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Target => write!(f, "target reached"),
            ExitReason::StopLoss => write!(f, "stop loss hit"),
            ExitReason::Structural(StructuralTrigger::DeltaFlip) => write!(f, "delta flip"),
            ExitReason::Structural(StructuralTrigger::GammaExhaustion) => {
                write!(f, "gamma exhaustion")
            }
            ExitReason::Structural(StructuralTrigger::ThetaSpike) => write!(f, "theta spike"),
            ExitReason::Forced(ForcedTrigger::StaleData) => write!(f, "stale market data"),
            ExitReason::Forced(ForcedTrigger::SpreadTooWide) => write!(f, "spread too wide"),
            ExitReason::Forced(ForcedTrigger::MarketClose) => write!(f, "market close"),
            ExitReason::KillSwitch(reason) => write!(f, "kill switch: {}", reason),
        }
    }
}

/// A live position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTrade {
    /// Trade identifier
    pub id: TradeId,
    /// Instrument identifier
    pub instrument: String,
    /// Position direction
    pub direction: Direction,
    /// Entry premium
    pub entry_price: Decimal,
    /// Quantity in lots
    pub quantity: u32,
    /// Contract lot multiplier
    pub lot_multiplier: Decimal,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// Current protective stop (tightened by the trailing logic)
    pub stop_price: Decimal,
    /// Target price
    pub target_price: Decimal,
    /// Last observed premium
    pub mark_price: Decimal,
    /// Running unrealized P&L
    pub unrealized_pnl: Decimal,
    /// Entry leg order id
    pub entry_order_id: OrderId,
    /// Protective stop leg order id
    pub stop_order_id: OrderId,
    status: TradeStatus,
}

impl ActiveTrade {
    /// Create a trade from a fully confirmed order pair
    pub fn open(
        pair: &LinkedOrderPair,
        direction: Direction,
        stop_price: Decimal,
        target_price: Decimal,
        lot_multiplier: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let entry = pair.entry();
        Self {
            id: Uuid::new_v4(),
            instrument: entry.spec.instrument.clone(),
            direction,
            entry_price: entry.spec.price,
            quantity: entry.spec.quantity,
            lot_multiplier,
            entry_time: now,
            stop_price,
            target_price,
            mark_price: entry.spec.price,
            unrealized_pnl: Decimal::ZERO,
            entry_order_id: entry.spec.client_id,
            stop_order_id: pair.stop().spec.client_id,
            status: TradeStatus::EntryPending,
        }
    }

    /// Current lifecycle status
    pub fn status(&self) -> TradeStatus {
        self.status
    }

    /// `EntryPending → Monitoring`
    pub fn confirm_entry(&mut self) -> Result<(), TradeStateError> {
        self.transition(TradeStatus::Monitoring)
    }

    /// `Monitoring → ExitPending`; idempotent when already pending
    pub fn begin_exit(&mut self) -> Result<(), TradeStateError> {
        if self.status == TradeStatus::ExitPending {
            return Ok(());
        }
        self.transition(TradeStatus::ExitPending)
    }

    /// `ExitPending → Exited`
    pub fn mark_exited(&mut self) -> Result<(), TradeStateError> {
        self.transition(TradeStatus::Exited)
    }

    fn transition(&mut self, to: TradeStatus) -> Result<(), TradeStateError> {
        // Monotonic: only single forward steps are valid
        let valid = matches!(
            (self.status, to),
            (TradeStatus::EntryPending, TradeStatus::Monitoring)
                | (TradeStatus::Monitoring, TradeStatus::ExitPending)
                | (TradeStatus::ExitPending, TradeStatus::Exited)
        );
        if !valid {
            return Err(TradeStateError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// P&L at the given premium
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        let per_point = Decimal::from(self.quantity) * self.lot_multiplier;
        match self.direction {
            Direction::Long => (price - self.entry_price) * per_point,
            Direction::Short => (self.entry_price - price) * per_point,
            Direction::Hold => Decimal::ZERO,
        }
    }

    /// Refresh mark price and unrealized P&L
    pub fn update_mark(&mut self, price: Decimal) {
        self.mark_price = price;
        self.unrealized_pnl = self.pnl_at(price);
    }
}

/// An immutable closed-trade record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// Originating trade identifier
    pub trade_id: TradeId,
    /// Instrument identifier
    pub instrument: String,
    /// Position direction
    pub direction: Direction,
    /// Entry premium
    pub entry_price: Decimal,
    /// Exit premium
    pub exit_price: Decimal,
    /// Quantity in lots
    pub quantity: u32,
    /// Realized P&L
    pub realized_pnl: Decimal,
    /// Exit reason
    pub reason: ExitReason,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// Exit timestamp
    pub exit_time: DateTime<Utc>,
}

impl ClosedTrade {
    /// Build the closed record for a trade exiting at `exit_price`
    pub fn from_trade(
        trade: &ActiveTrade,
        exit_price: Decimal,
        reason: ExitReason,
        exit_time: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_id: trade.id,
            instrument: trade.instrument.clone(),
            direction: trade.direction,
            entry_price: trade.entry_price,
            exit_price,
            quantity: trade.quantity,
            realized_pnl: trade.pnl_at(exit_price),
            reason,
            entry_time: trade.entry_time,
            exit_time,
        }
    }

    /// True when the trade lost money
    pub fn is_loss(&self) -> bool {
        self.realized_pnl < Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{OrderKind, OrderSide, OrderSpec};
    use crate::execution::BrokerOrder;
    use crate::broker::OrderStatus;
    use rust_decimal_macros::dec;

    pub(crate) fn test_trade(direction: Direction) -> ActiveTrade {
        let entry_spec = OrderSpec::new(
            "NIFTY24500CE",
            OrderSide::Buy,
            OrderKind::Market,
            1,
            dec!(100),
        );
        let stop_spec = OrderSpec::new(
            "NIFTY24500CE",
            OrderSide::Sell,
            OrderKind::Stop,
            1,
            dec!(95),
        );
        let entry = BrokerOrder::with_status(entry_spec, OrderStatus::Executed);
        let stop = BrokerOrder::with_status(stop_spec, OrderStatus::Placed);
        let pair = LinkedOrderPair::confirm(entry, stop).unwrap();

        ActiveTrade::open(&pair, direction, dec!(95), dec!(110), dec!(100), Utc::now())
    }

    #[test]
    fn test_lifecycle_forward() {
        let mut trade = test_trade(Direction::Long);
        assert_eq!(trade.status(), TradeStatus::EntryPending);

        trade.confirm_entry().unwrap();
        assert_eq!(trade.status(), TradeStatus::Monitoring);

        trade.begin_exit().unwrap();
        assert_eq!(trade.status(), TradeStatus::ExitPending);

        trade.mark_exited().unwrap();
        assert_eq!(trade.status(), TradeStatus::Exited);
    }

    #[test]
    fn test_lifecycle_rejects_reversal() {
        let mut trade = test_trade(Direction::Long);
        trade.confirm_entry().unwrap();
        trade.begin_exit().unwrap();

        let err = trade.confirm_entry().unwrap_err();
        assert_eq!(err.from, TradeStatus::ExitPending);
        assert_eq!(err.to, TradeStatus::Monitoring);
        assert_eq!(trade.status(), TradeStatus::ExitPending);
    }

    #[test]
    fn test_lifecycle_rejects_skip() {
        let mut trade = test_trade(Direction::Long);
        assert!(trade.mark_exited().is_err());
        assert_eq!(trade.status(), TradeStatus::EntryPending);
    }

    #[test]
    fn test_begin_exit_idempotent() {
        let mut trade = test_trade(Direction::Long);
        trade.confirm_entry().unwrap();
        trade.begin_exit().unwrap();
        trade.begin_exit().unwrap();
        assert_eq!(trade.status(), TradeStatus::ExitPending);
    }

    #[test]
    fn test_exited_is_terminal() {
        let mut trade = test_trade(Direction::Long);
        trade.confirm_entry().unwrap();
        trade.begin_exit().unwrap();
        trade.mark_exited().unwrap();

        assert!(trade.begin_exit().is_err());
        assert!(trade.mark_exited().is_err());
    }

    #[test]
    fn test_pnl_long() {
        let trade = test_trade(Direction::Long);
        // (102 - 100) * 1 * 100 = 200
        assert_eq!(trade.pnl_at(dec!(102)), dec!(200));
        assert_eq!(trade.pnl_at(dec!(98)), dec!(-200));
    }

    #[test]
    fn test_pnl_short() {
        let trade = test_trade(Direction::Short);
        assert_eq!(trade.pnl_at(dec!(98)), dec!(200));
        assert_eq!(trade.pnl_at(dec!(102)), dec!(-200));
    }

    #[test]
    fn test_update_mark() {
        let mut trade = test_trade(Direction::Long);
        trade.update_mark(dec!(104));
        assert_eq!(trade.mark_price, dec!(104));
        assert_eq!(trade.unrealized_pnl, dec!(400));
    }

    #[test]
    fn test_closed_trade_from_trade() {
        let trade = test_trade(Direction::Long);
        let closed = ClosedTrade::from_trade(&trade, dec!(101), ExitReason::Target, Utc::now());

        assert_eq!(closed.realized_pnl, dec!(100));
        assert_eq!(closed.reason, ExitReason::Target);
        assert!(!closed.is_loss());

        let losing = ClosedTrade::from_trade(&trade, dec!(95), ExitReason::StopLoss, Utc::now());
        assert!(losing.is_loss());
    }

    #[test]
    fn test_exit_reason_display() {
        assert_eq!(ExitReason::Target.to_string(), "target reached");
        assert_eq!(
            ExitReason::Structural(StructuralTrigger::DeltaFlip).to_string(),
            "delta flip"
        );
        assert_eq!(
            ExitReason::KillSwitch(KillSwitchReason::CircuitBreaker).to_string(),
            "kill switch: circuit breaker tripped"
        );
    }
}
