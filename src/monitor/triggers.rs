//! Exit trigger evaluation
//!
//! One evaluation per market update per open trade. Triggers are checked in
//! a fixed priority order so simultaneous conditions always record the same
//! exit reason: forced conditions (data quality, session boundary) first,
//! then target, then stop, then structural invalidation. The trailing-stop
//! update runs last and is a mutation, not an exit.

use crate::config::{MonitorConfig, SessionConfig};
use crate::market::MarketSnapshot;
use crate::signal::Direction;
use crate::trade::{ActiveTrade, ExitReason, ForcedTrigger, StructuralTrigger, TradeStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Outcome of one monitor evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Position stays open
    Continue,
    /// An exit is requested for the given reason
    Exit(ExitReason),
}

/// Evaluate all exit triggers for one trade against a fresh snapshot.
///
/// Refreshes the trade's mark price and unrealized P&L, then walks the
/// trigger priority. Never blocks and never touches the broker; callers act
/// on the returned decision.
pub fn on_tick(
    trade: &mut ActiveTrade,
    snapshot: &MarketSnapshot,
    now: DateTime<Utc>,
    monitor: &MonitorConfig,
    session: &SessionConfig,
) -> TickOutcome {
    if trade.status() != TradeStatus::Monitoring {
        return TickOutcome::Continue;
    }

    trade.update_mark(snapshot.last_price);

    // 1. Forced conditions, independent of trade economics
    if snapshot.is_stale(now, monitor.staleness_timeout_secs) {
        return TickOutcome::Exit(ExitReason::Forced(ForcedTrigger::StaleData));
    }
    if snapshot.spread() > monitor.max_spread {
        return TickOutcome::Exit(ExitReason::Forced(ForcedTrigger::SpreadTooWide));
    }
    if session.past_force_exit(now) {
        return TickOutcome::Exit(ExitReason::Forced(ForcedTrigger::MarketClose));
    }

    // 2. Target
    if target_reached(trade, snapshot.last_price) {
        return TickOutcome::Exit(ExitReason::Target);
    }

    // 3. Stop
    if stop_reached(trade, snapshot.last_price) {
        return TickOutcome::Exit(ExitReason::StopLoss);
    }

    // 4. Structural invalidation, each independently sufficient
    if delta_flipped(trade.direction, snapshot.delta) {
        return TickOutcome::Exit(ExitReason::Structural(StructuralTrigger::DeltaFlip));
    }
    if snapshot.gamma < monitor.gamma_exhaustion_floor {
        return TickOutcome::Exit(ExitReason::Structural(StructuralTrigger::GammaExhaustion));
    }
    if snapshot.theta.abs() > monitor.theta_spike_ceiling {
        return TickOutcome::Exit(ExitReason::Structural(StructuralTrigger::ThetaSpike));
    }

    // 5. Trailing stop maintenance
    update_trailing_stop(trade, snapshot.last_price, monitor);

    TickOutcome::Continue
}

fn target_reached(trade: &ActiveTrade, price: Decimal) -> bool {
    match trade.direction {
        Direction::Long => price >= trade.target_price,
        Direction::Short => price <= trade.target_price,
        Direction::Hold => false,
    }
}

fn stop_reached(trade: &ActiveTrade, price: Decimal) -> bool {
    match trade.direction {
        Direction::Long => price <= trade.stop_price,
        Direction::Short => price >= trade.stop_price,
        Direction::Hold => false,
    }
}

fn delta_flipped(direction: Direction, delta: Decimal) -> bool {
    match direction {
        Direction::Long => delta <= Decimal::ZERO,
        Direction::Short => delta >= Decimal::ZERO,
        Direction::Hold => false,
    }
}

/// Tighten the stop once unrealized gain exceeds the activation threshold.
/// The stop only ever moves in the protective direction.
fn update_trailing_stop(trade: &mut ActiveTrade, price: Decimal, monitor: &MonitorConfig) {
    if trade.entry_price.is_zero() {
        return;
    }

    match trade.direction {
        Direction::Long => {
            let gain = (price - trade.entry_price) / trade.entry_price;
            if gain >= monitor.trailing_activation_pct {
                let candidate = price * (Decimal::ONE - monitor.trailing_offset_pct);
                if candidate > trade.stop_price {
                    tracing::debug!(
                        trade_id = %trade.id,
                        old_stop = %trade.stop_price,
                        new_stop = %candidate,
                        "Trailing stop tightened"
                    );
                    trade.stop_price = candidate;
                }
            }
        }
        Direction::Short => {
            let gain = (trade.entry_price - price) / trade.entry_price;
            if gain >= monitor.trailing_activation_pct {
                let candidate = price * (Decimal::ONE + monitor.trailing_offset_pct);
                if candidate < trade.stop_price {
                    tracing::debug!(
                        trade_id = %trade.id,
                        old_stop = %trade.stop_price,
                        new_stop = %candidate,
                        "Trailing stop tightened"
                    );
                    trade.stop_price = candidate;
                }
            }
        }
        Direction::Hold => {}
    }
}
