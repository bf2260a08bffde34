//! Emergency exit path
//!
//! Force-closes a single position: cancels the resting protective order,
//! submits a market close with bounded retries and backoff, and either
//! returns the closed record or leaves the trade `ExitPending` with a fatal
//! alert. This is the one state the engine cannot self-heal; the caller
//! escalates it to the circuit breaker.

use crate::broker::{BrokerClient, BrokerError, OrderKind, OrderSide, OrderSpec};
use crate::config::BrokerConfig;
use crate::execution::submit_confirmed;
use crate::trade::{ActiveTrade, ClosedTrade, ExitReason, TradeStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Emergency exit failure
#[derive(Debug, Error)]
pub enum ExitFailure {
    /// The trade was already closed
    #[error("trade already exited")]
    AlreadyClosed,
    /// No close confirmation after every retry; position remains open
    #[error("exit unconfirmed after {attempts} attempts: {last_error}")]
    Unconfirmed {
        attempts: u32,
        last_error: BrokerError,
    },
}

/// Force-closes positions against the broker
pub struct EmergencyExit {
    broker: Arc<dyn BrokerClient>,
    config: BrokerConfig,
}

impl EmergencyExit {
    /// Create an emergency exit path over the given broker
    pub fn new(broker: Arc<dyn BrokerClient>, config: BrokerConfig) -> Self {
        Self { broker, config }
    }

    /// Force-close one trade.
    ///
    /// On success the trade is `Exited` and the closed record is returned.
    /// On exhausted retries the trade stays `ExitPending` indefinitely and
    /// the failure is returned for escalation.
    pub async fn force_exit(
        &self,
        trade: &mut ActiveTrade,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Result<ClosedTrade, ExitFailure> {
        match trade.status() {
            TradeStatus::Exited => return Err(ExitFailure::AlreadyClosed),
            TradeStatus::EntryPending => {
                // Entry was executed (the trade exists), so monitoring is the
                // truthful state to pass through on the way out
                let _ = trade.confirm_entry();
            }
            _ => {}
        }
        if trade.begin_exit().is_err() {
            return Err(ExitFailure::AlreadyClosed);
        }

        tracing::warn!(
            trade_id = %trade.id,
            instrument = %trade.instrument,
            reason = %reason,
            "Forcing exit"
        );

        // Take down the resting stop so the close cannot double-fill.
        // A failed cancel is logged, not fatal: the stop may already be done.
        if let Err(e) = self.broker.cancel_order(trade.stop_order_id).await {
            tracing::warn!(
                trade_id = %trade.id,
                order_id = %trade.stop_order_id,
                error = %e,
                "Failed to cancel protective stop before exit"
            );
        }

        let mut last_error = BrokerError::Timeout;
        let attempts = self.config.max_retries + 1;
        for attempt in 0..attempts {
            if attempt > 0 {
                let backoff = Duration::from_millis(self.config.retry_backoff_ms * attempt as u64);
                tokio::time::sleep(backoff).await;
            }

            let close_spec = OrderSpec::new(
                trade.instrument.clone(),
                OrderSide::Sell,
                OrderKind::Market,
                trade.quantity,
                trade.mark_price,
            );
            match submit_confirmed(&*self.broker, &self.config, &close_spec, true).await {
                Ok(order) => {
                    let exit_price = order.spec.price;
                    // Status mutation cannot fail from ExitPending
                    let _ = trade.mark_exited();
                    let closed = ClosedTrade::from_trade(trade, exit_price, reason, now);
                    tracing::info!(
                        trade_id = %trade.id,
                        %exit_price,
                        pnl = %closed.realized_pnl,
                        reason = %reason,
                        "Position force-closed"
                    );
                    return Ok(closed);
                }
                Err(e) => {
                    tracing::warn!(trade_id = %trade.id, attempt, error = %e, "Exit attempt failed");
                    last_error = e;
                }
            }
        }

        tracing::error!(
            trade_id = %trade.id,
            instrument = %trade.instrument,
            attempts,
            error = %last_error,
            "FATAL: exit unconfirmed, position remains open"
        );
        Err(ExitFailure::Unconfirmed {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{OrderStatus, PaperBroker, SubmitOutcome};
    use crate::execution::{BrokerOrder, LinkedOrderPair};
    use crate::signal::Direction;
    use rust_decimal_macros::dec;

    fn test_config() -> BrokerConfig {
        BrokerConfig {
            confirm_timeout_secs: 1,
            status_poll_ms: 10,
            max_retries: 2,
            retry_backoff_ms: 10,
            max_consecutive_failures: 3,
        }
    }

    async fn live_trade(broker: &PaperBroker) -> ActiveTrade {
        let entry_spec = OrderSpec::new("NIFTY24500CE", OrderSide::Buy, OrderKind::Market, 1, dec!(100));
        let stop_spec = OrderSpec::new("NIFTY24500CE", OrderSide::Sell, OrderKind::Stop, 1, dec!(95));
        broker.submit_order(&entry_spec).await.unwrap();
        broker.submit_order(&stop_spec).await.unwrap();

        let entry = BrokerOrder::with_status(entry_spec, OrderStatus::Executed);
        let stop = BrokerOrder::with_status(stop_spec, OrderStatus::Placed);
        let pair = LinkedOrderPair::confirm(entry, stop).unwrap();

        let mut trade =
            ActiveTrade::open(&pair, Direction::Long, dec!(95), dec!(110), dec!(100), Utc::now());
        trade.confirm_entry().unwrap();
        trade
    }

    #[tokio::test]
    async fn test_force_exit_success() {
        let broker = Arc::new(PaperBroker::new());
        let exit = EmergencyExit::new(broker.clone(), test_config());
        let mut trade = live_trade(&broker).await;
        trade.update_mark(dec!(101));

        let closed = exit
            .force_exit(&mut trade, ExitReason::Target, Utc::now())
            .await
            .unwrap();

        assert_eq!(trade.status(), TradeStatus::Exited);
        assert_eq!(closed.exit_price, dec!(101));
        assert_eq!(closed.realized_pnl, dec!(100));

        // Stop leg was cancelled before the close
        assert_eq!(
            broker.query_status(trade.stop_order_id).await.unwrap(),
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_force_exit_retries_then_succeeds() {
        let broker = Arc::new(PaperBroker::new());
        let exit = EmergencyExit::new(broker.clone(), test_config());
        let mut trade = live_trade(&broker).await;

        broker
            .script_submits(vec![
                SubmitOutcome::Fail(BrokerError::Transport("flap".into())),
                SubmitOutcome::Accept,
            ])
            .await;

        let closed = exit
            .force_exit(&mut trade, ExitReason::StopLoss, Utc::now())
            .await
            .unwrap();
        assert_eq!(trade.status(), TradeStatus::Exited);
        assert!(closed.is_loss() || closed.realized_pnl >= dec!(0));
    }

    #[tokio::test]
    async fn test_force_exit_exhausted_leaves_exit_pending() {
        let broker = Arc::new(PaperBroker::new());
        let config = test_config();
        let exit = EmergencyExit::new(broker.clone(), config.clone());
        let mut trade = live_trade(&broker).await;

        let failures = (0..=config.max_retries)
            .map(|_| SubmitOutcome::Fail(BrokerError::Transport("down".into())))
            .collect();
        broker.script_submits(failures).await;

        let result = exit
            .force_exit(&mut trade, ExitReason::StopLoss, Utc::now())
            .await;
        assert!(matches!(result, Err(ExitFailure::Unconfirmed { attempts: 3, .. })));
        assert_eq!(trade.status(), TradeStatus::ExitPending);
    }

    #[tokio::test]
    async fn test_force_exit_survives_cancel_failure() {
        let broker = Arc::new(PaperBroker::new());
        let exit = EmergencyExit::new(broker.clone(), test_config());
        let mut trade = live_trade(&broker).await;
        broker.fail_cancels(true).await;

        let closed = exit
            .force_exit(&mut trade, ExitReason::Target, Utc::now())
            .await
            .unwrap();
        assert_eq!(closed.reason, ExitReason::Target);
    }

    #[tokio::test]
    async fn test_force_exit_already_closed() {
        let broker = Arc::new(PaperBroker::new());
        let exit = EmergencyExit::new(broker.clone(), test_config());
        let mut trade = live_trade(&broker).await;

        exit.force_exit(&mut trade, ExitReason::Target, Utc::now())
            .await
            .unwrap();
        let second = exit
            .force_exit(&mut trade, ExitReason::Target, Utc::now())
            .await;
        assert!(matches!(second, Err(ExitFailure::AlreadyClosed)));
    }

    #[tokio::test]
    async fn test_force_exit_retries_exit_pending_trade() {
        let broker = Arc::new(PaperBroker::new());
        let config = test_config();
        let exit = EmergencyExit::new(broker.clone(), config.clone());
        let mut trade = live_trade(&broker).await;

        // First pass exhausts retries and leaves the trade pending
        let failures = (0..=config.max_retries)
            .map(|_| SubmitOutcome::Fail(BrokerError::Transport("down".into())))
            .collect();
        broker.script_submits(failures).await;
        assert!(exit
            .force_exit(&mut trade, ExitReason::StopLoss, Utc::now())
            .await
            .is_err());

        // A later attempt (e.g. from the kill switch) can still close it
        let closed = exit
            .force_exit(&mut trade, ExitReason::StopLoss, Utc::now())
            .await
            .unwrap();
        assert_eq!(trade.status(), TradeStatus::Exited);
        assert_eq!(closed.reason, ExitReason::StopLoss);
    }
}
