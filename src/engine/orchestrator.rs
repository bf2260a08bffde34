//! Trade lifecycle orchestrator
//!
//! Owns the shared state (risk ledger, position slots, closed-trade ledger)
//! and drives the full lifecycle: admit, size, place, monitor, exit, record.
//! The entry path and the tick loop may run from different tasks; every
//! mutation of a trade goes through its slot mutex and every ledger mutation
//! through the ledger mutex. Slot locks are always taken before the ledger
//! lock, never the other way around.

use super::types::{ActiveSummary, ClosedSummary, EnterError, PositionSummary, RiskStatus};
use crate::broker::{BrokerClient, OrderKind, OrderSide, OrderSpec};
use crate::config::Config;
use crate::execution::OrderCoordinator;
use crate::market::MarketSnapshot;
use crate::monitor::{on_tick, TickOutcome};
use crate::risk::{
    compute_stop, compute_target, size_position, Admission, LockReason, RejectReason, RiskLedger,
    SafetyGate, SlotState,
};
use crate::safety::{CircuitBreaker, EmergencyExit};
use crate::signal::TradeSignal;
use crate::telemetry::{inc_counter, set_gauge, CounterMetric, GaugeMetric};
use crate::trade::{
    ActiveTrade, ClosedTrade, ExitReason, KillSwitchReason, ReserveError, TradeBook, TradeId,
    TradeJournal,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Order execution and risk management engine
pub struct Engine {
    config: Config,
    ledger: Mutex<RiskLedger>,
    book: TradeBook,
    closed: Mutex<Vec<ClosedTrade>>,
    journal: Option<Mutex<TradeJournal>>,
    gate: SafetyGate,
    coordinator: OrderCoordinator,
    emergency: EmergencyExit,
    breaker: CircuitBreaker,
    last_snapshot: Mutex<Option<MarketSnapshot>>,
}

impl Engine {
    /// Create an engine over the given broker, without journaling
    pub fn new(config: Config, broker: Arc<dyn BrokerClient>) -> Self {
        let gate = SafetyGate::new(
            config.sizing.min_confidence,
            config.monitor.staleness_timeout_secs,
            config.monitor.max_spread,
        );
        let coordinator = OrderCoordinator::new(Arc::clone(&broker), config.broker.clone());
        let emergency = EmergencyExit::new(Arc::clone(&broker), config.broker.clone());
        let breaker = CircuitBreaker::new(config.broker.max_consecutive_failures);
        let ledger = Mutex::new(RiskLedger::new(config.risk.clone()));
        let book = TradeBook::new(config.risk.max_concurrent_positions);

        Self {
            config,
            ledger,
            book,
            closed: Mutex::new(Vec::new()),
            journal: None,
            gate,
            coordinator,
            emergency,
            breaker,
            last_snapshot: Mutex::new(None),
        }
    }

    /// Attach a durable closed-trade journal
    pub fn with_journal(mut self, journal: TradeJournal) -> Self {
        self.journal = Some(Mutex::new(journal));
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Attempt to turn a signal into a live position.
    ///
    /// Gate, size, and place, in that order. The target slot's lock is held
    /// from admission through placement, so concurrent entries cannot share
    /// a slot and the monitor cannot observe a half-created trade.
    pub async fn try_enter(
        &self,
        signal: &TradeSignal,
        now: DateTime<Utc>,
    ) -> Result<TradeId, EnterError> {
        if self.breaker.is_tripped() {
            return Err(EnterError::CircuitOpen);
        }

        let slot_result = self.book.reserve(&signal.instrument).await;
        let slot_state = match &slot_result {
            Ok(_) => SlotState::Free,
            Err(ReserveError::NoFreeSlot) => SlotState::Full,
            Err(ReserveError::Conflict) => SlotState::Conflict,
        };

        let market_open = self.config.session.is_market_open(now);
        let snapshot = { self.last_snapshot.lock().await.clone() };
        let admission = {
            let ledger = self.ledger.lock().await;
            self.gate
                .evaluate(signal, &ledger, market_open, slot_state, snapshot.as_ref(), now)
        };
        if let Admission::Reject(reason) = admission {
            tracing::info!(instrument = %signal.instrument, %reason, "Entry rejected");
            inc_counter(CounterMetric::EntriesRejected);
            return Err(EnterError::Rejected(reason));
        }

        let mut slot = match slot_result {
            Ok(guard) => guard,
            // Unreachable: the gate rejects when no slot was reserved
            Err(_) => return Err(EnterError::Rejected(RejectReason::SlotOccupied)),
        };

        let stop_price = compute_stop(
            signal.entry_price,
            signal.structural_reference,
            signal.direction,
            &self.config.sizing,
        );
        let quantity = size_position(
            signal.entry_price,
            stop_price,
            self.config.risk.risk_per_trade,
            self.config.sizing.lot_multiplier,
        )
        .map_err(EnterError::Sizing)?;
        let target_price =
            compute_target(signal.entry_price, signal.direction, self.config.sizing.target_pct);

        let entry_spec = OrderSpec::new(
            signal.instrument.clone(),
            OrderSide::Buy,
            OrderKind::Limit,
            quantity,
            signal.entry_price,
        );
        let stop_spec = OrderSpec::new(
            signal.instrument.clone(),
            OrderSide::Sell,
            OrderKind::Stop,
            quantity,
            stop_price,
        );

        match self.coordinator.place(entry_spec, stop_spec).await {
            Ok(pair) => {
                self.breaker.record_success();
                let mut trade = ActiveTrade::open(
                    &pair,
                    signal.direction,
                    stop_price,
                    target_price,
                    self.config.sizing.lot_multiplier,
                    now,
                );
                let _ = trade.confirm_entry();
                let id = trade.id;
                tracing::info!(
                    trade_id = %id,
                    instrument = %trade.instrument,
                    entry = %trade.entry_price,
                    stop = %stop_price,
                    target = %target_price,
                    quantity,
                    "Position opened"
                );
                *slot = Some(trade);
                drop(slot);

                inc_counter(CounterMetric::TradesOpened);
                set_gauge(
                    GaugeMetric::OpenPositions,
                    self.book.occupied_count().await as f64,
                );
                Ok(id)
            }
            Err(failure) => {
                drop(slot);
                let fatal = failure.is_fatal();
                let tripped = self.breaker.record_failure();

                if fatal {
                    // Unresolved orphan: open exposure without a stop. Halt
                    // everything while it is resolved out-of-band.
                    self.breaker.trip();
                    inc_counter(CounterMetric::BreakerTrips);
                    self.kill_switch(KillSwitchReason::FatalExit, now).await;
                } else if tripped {
                    inc_counter(CounterMetric::BreakerTrips);
                    self.kill_switch(KillSwitchReason::CircuitBreaker, now).await;
                }
                Err(EnterError::Placement(failure))
            }
        }
    }

    /// Evaluate every open position against a fresh market snapshot.
    ///
    /// Exit decisions are acted on before returning: the close goes through
    /// the emergency path and the result lands in the ledger and journal.
    pub async fn tick(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) {
        {
            let mut last = self.last_snapshot.lock().await;
            *last = Some(snapshot.clone());
        }

        let mut escalate = false;
        let mut total_unrealized = Decimal::ZERO;

        for slot in self.book.slots() {
            let mut guard = slot.lock().await;
            let Some(trade) = guard.as_mut() else {
                continue;
            };

            match on_tick(trade, snapshot, now, &self.config.monitor, &self.config.session) {
                TickOutcome::Continue => {
                    total_unrealized += trade.unrealized_pnl;
                }
                TickOutcome::Exit(reason) => {
                    tracing::info!(trade_id = %trade.id, %reason, "Exit triggered");
                    match self.emergency.force_exit(trade, reason, now).await {
                        Ok(closed) => {
                            *guard = None;
                            drop(guard);
                            self.breaker.record_success();
                            self.record_close(closed).await;
                        }
                        Err(e) => {
                            // Trade stays ExitPending in its slot
                            tracing::error!(trade_id = %trade.id, error = %e, "Exit failed");
                            if self.breaker.record_failure() {
                                inc_counter(CounterMetric::BreakerTrips);
                                escalate = true;
                            }
                        }
                    }
                }
            }
        }

        set_gauge(GaugeMetric::UnrealizedPnl, decimal_to_f64(total_unrealized));
        set_gauge(
            GaugeMetric::OpenPositions,
            self.book.occupied_count().await as f64,
        );

        if escalate {
            self.kill_switch(KillSwitchReason::CircuitBreaker, now).await;
        }
    }

    /// Force-close every open position and lock the ledger.
    ///
    /// The ledger locks first so no new entry can race the flattening.
    /// Idempotent: a second activation finds a locked ledger and an empty
    /// book and changes nothing.
    pub async fn kill_switch(
        &self,
        reason: KillSwitchReason,
        now: DateTime<Utc>,
    ) -> Vec<ClosedTrade> {
        tracing::error!(%reason, "Kill switch activated");
        inc_counter(CounterMetric::KillSwitchActivations);

        {
            let mut ledger = self.ledger.lock().await;
            ledger.lock(
                Duration::minutes(self.config.session.kill_lock_minutes as i64),
                LockReason::KillSwitch,
                now,
            );
        }

        let mut closed_trades = Vec::new();
        for slot in self.book.slots() {
            let mut guard = slot.lock().await;
            let Some(trade) = guard.as_mut() else {
                continue;
            };

            match self
                .emergency
                .force_exit(trade, ExitReason::KillSwitch(reason), now)
                .await
            {
                Ok(closed) => {
                    *guard = None;
                    drop(guard);
                    self.record_close(closed.clone()).await;
                    closed_trades.push(closed);
                }
                Err(e) => {
                    tracing::error!(
                        trade_id = %trade.id,
                        error = %e,
                        "Kill switch could not close position; remains open"
                    );
                }
            }
        }

        set_gauge(
            GaugeMetric::OpenPositions,
            self.book.occupied_count().await as f64,
        );
        closed_trades
    }

    /// Manually reset the circuit breaker after out-of-band resolution
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// Whether the circuit breaker is currently open
    pub fn breaker_tripped(&self) -> bool {
        self.breaker.is_tripped()
    }

    /// Record a confirmed close in the ledger, journal, and closed list
    async fn record_close(&self, closed: ClosedTrade) {
        {
            let mut ledger = self.ledger.lock().await;
            ledger.record_result(closed.realized_pnl, closed.exit_time);
            set_gauge(GaugeMetric::DailyLoss, decimal_to_f64(ledger.daily_loss()));
            set_gauge(GaugeMetric::RealizedPnl, decimal_to_f64(ledger.daily_pnl()));
            set_gauge(GaugeMetric::TradesToday, ledger.trades_today() as f64);
        }

        if let Some(journal) = &self.journal {
            let mut journal = journal.lock().await;
            if let Err(e) = journal.append(&closed) {
                tracing::error!(trade_id = %closed.trade_id, error = %e, "Failed to journal close");
            }
        }

        inc_counter(CounterMetric::TradesClosed);
        let mut list = self.closed.lock().await;
        list.push(closed);
    }

    /// Rebuild today's risk counters from the journal after a restart.
    ///
    /// Returns the number of records replayed.
    pub async fn recover_from_journal(
        &self,
        path: impl AsRef<std::path::Path>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<usize> {
        let trades = TradeJournal::replay_day(path, now)?;
        let count = trades.len();

        let mut ledger = self.ledger.lock().await;
        let mut list = self.closed.lock().await;
        for trade in trades {
            ledger.record_result(trade.realized_pnl, trade.exit_time);
            list.push(trade);
        }
        tracing::info!(count, "Recovered closed trades from journal");
        Ok(count)
    }

    /// Reset the ledger and breaker for a new trading day
    pub async fn reset_for_new_day(&self, now: DateTime<Utc>) {
        let mut ledger = self.ledger.lock().await;
        ledger.reset_for_new_day(now);
        self.breaker.reset();
        let mut list = self.closed.lock().await;
        list.clear();
    }

    /// Summary of open positions
    pub async fn active_summary(&self) -> ActiveSummary {
        let trades = self.book.live_trades().await;
        let total_unrealized_pnl = trades.iter().map(|t| t.unrealized_pnl).sum();
        ActiveSummary {
            count: trades.len(),
            total_unrealized_pnl,
            positions: trades.iter().map(PositionSummary::from).collect(),
        }
    }

    /// Summary of closed trades
    pub async fn closed_summary(&self) -> ClosedSummary {
        let closed = self.closed.lock().await;
        let total_trades = closed.len();
        let wins = closed.iter().filter(|t| t.realized_pnl > Decimal::ZERO).count();
        let total_pnl = closed.iter().map(|t| t.realized_pnl).sum();
        let win_rate = if total_trades == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(wins as u64) / Decimal::from(total_trades as u64)
        };
        ClosedSummary {
            total_trades,
            wins,
            win_rate,
            total_pnl,
        }
    }

    /// Closed-trade records
    pub async fn closed_trades(&self) -> Vec<ClosedTrade> {
        self.closed.lock().await.clone()
    }

    /// Current risk ledger status
    pub async fn risk_status(&self, now: DateTime<Utc>) -> RiskStatus {
        let ledger = self.ledger.lock().await;
        RiskStatus {
            can_trade: ledger.can_trade(now) && !self.breaker.is_tripped(),
            trades_today: ledger.trades_today(),
            consecutive_losses: ledger.consecutive_losses(),
            daily_loss: ledger.daily_loss(),
            daily_pnl: ledger.daily_pnl(),
            locked_until: ledger.locked_until(),
        }
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}
