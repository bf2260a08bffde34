//! Atomic two-leg order coordinator
//!
//! Places the entry leg and its protective stop as one logical transaction.
//! On a stop-leg failure the freshly filled entry is an orphaned position;
//! the coordinator closes it synchronously, before control returns, so no
//! caller can ever observe "entry open, no stop".

use super::types::{BrokerOrder, LinkedOrderPair, PlacementFailure};
use crate::broker::{BrokerClient, BrokerError, OrderKind, OrderSpec, OrderStatus};
use crate::config::BrokerConfig;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Submit an order and wait for broker confirmation within the configured
/// timeout.
///
/// `require_execution` distinguishes the two leg kinds: an entry must reach
/// `Executed`, a protective stop only needs to rest as `Placed`. A timed-out
/// or errored submission is reconciled by a status query before it is
/// reported as failure — the order may have reached the broker anyway, and
/// double-submitting is worse than a slow confirm.
pub async fn submit_confirmed(
    broker: &dyn BrokerClient,
    config: &BrokerConfig,
    spec: &OrderSpec,
    require_execution: bool,
) -> Result<BrokerOrder, BrokerError> {
    let deadline = Instant::now() + Duration::from_secs(config.confirm_timeout_secs);
    let mut order = BrokerOrder::new(spec.clone());

    let submit = tokio::time::timeout(
        Duration::from_secs(config.confirm_timeout_secs),
        broker.submit_order(spec),
    )
    .await;

    let submit_error = match submit {
        Ok(Ok(_id)) => None,
        Ok(Err(e)) => Some(e),
        Err(_elapsed) => Some(BrokerError::Timeout),
    };

    if let Some(err) = submit_error {
        // Reconcile before assuming failure
        return match broker.query_status(spec.client_id).await {
            Ok(OrderStatus::Executed) => {
                tracing::warn!(
                    order_id = %spec.client_id,
                    error = %err,
                    "Submission errored but order executed; reconciled"
                );
                order.mark(OrderStatus::Executed, Utc::now());
                Ok(order)
            }
            Ok(OrderStatus::Placed) if !require_execution => {
                order.mark(OrderStatus::Placed, Utc::now());
                Ok(order)
            }
            Ok(OrderStatus::Placed) => {
                // Resting but unconfirmed entry: take it down so it cannot
                // fill behind our back
                if let Err(cancel_err) = broker.cancel_order(spec.client_id).await {
                    tracing::warn!(
                        order_id = %spec.client_id,
                        error = %cancel_err,
                        "Failed to cancel unconfirmed entry"
                    );
                }
                Err(err)
            }
            Ok(_) | Err(_) => Err(err),
        };
    }

    order.mark(OrderStatus::Placed, Utc::now());
    await_confirmation(broker, config, order, require_execution, deadline).await
}

async fn await_confirmation(
    broker: &dyn BrokerClient,
    config: &BrokerConfig,
    mut order: BrokerOrder,
    require_execution: bool,
    deadline: Instant,
) -> Result<BrokerOrder, BrokerError> {
    let poll = Duration::from_millis(config.status_poll_ms);
    loop {
        match broker.query_status(order.spec.client_id).await? {
            OrderStatus::Executed => {
                order.mark(OrderStatus::Executed, Utc::now());
                return Ok(order);
            }
            OrderStatus::Placed if !require_execution => {
                order.mark(OrderStatus::Placed, Utc::now());
                return Ok(order);
            }
            OrderStatus::Rejected => {
                return Err(BrokerError::Rejected("rejected by broker".into()));
            }
            OrderStatus::Cancelled => {
                return Err(BrokerError::Rejected("cancelled at broker".into()));
            }
            OrderStatus::Placed | OrderStatus::Pending => {}
        }

        if Instant::now() >= deadline {
            // Unfilled within the window: cancel so it cannot fill later
            if let Err(e) = broker.cancel_order(order.spec.client_id).await {
                tracing::warn!(
                    order_id = %order.spec.client_id,
                    error = %e,
                    "Failed to cancel unfilled order on timeout"
                );
            }
            return Err(BrokerError::Timeout);
        }
        tokio::time::sleep(poll).await;
    }
}

/// Places entry + protective stop pairs against the broker
pub struct OrderCoordinator {
    broker: Arc<dyn BrokerClient>,
    config: BrokerConfig,
}

impl OrderCoordinator {
    /// Create a coordinator over the given broker
    pub fn new(broker: Arc<dyn BrokerClient>, config: BrokerConfig) -> Self {
        Self { broker, config }
    }

    /// Place both legs as one transaction.
    ///
    /// Returns a [`LinkedOrderPair`] only when the entry executed and the
    /// stop is resting. Any other outcome is a [`PlacementFailure`], and by
    /// the time it is returned the entry leg has either never existed or
    /// been unwound (or, in the fatal case, flagged as unresolved).
    pub async fn place(
        &self,
        entry_spec: OrderSpec,
        stop_spec: OrderSpec,
    ) -> Result<LinkedOrderPair, PlacementFailure> {
        let entry = match submit_confirmed(&*self.broker, &self.config, &entry_spec, true).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(error = %e, "Entry leg failed; no position created");
                return Err(PlacementFailure::Entry(e));
            }
        };
        tracing::info!(order_id = %entry.spec.client_id, price = %entry.spec.price, "Entry leg executed");

        match submit_confirmed(&*self.broker, &self.config, &stop_spec, false).await {
            Ok(stop) => {
                tracing::info!(order_id = %stop.spec.client_id, trigger = %stop.spec.price, "Protective stop placed");
                LinkedOrderPair::confirm(entry, stop).map_err(|e| {
                    // Unreachable given the confirmation requirements above
                    PlacementFailure::Entry(BrokerError::Transport(e.to_string()))
                })
            }
            Err(stop_error) => {
                tracing::error!(
                    error = %stop_error,
                    "Stop leg failed with entry executed; unwinding orphaned entry"
                );
                match self.unwind_entry(&entry_spec).await {
                    Ok(exit_price) => {
                        tracing::warn!(%exit_price, "Orphaned entry unwound");
                        Err(PlacementFailure::StopUnwound {
                            stop_error,
                            exit_price,
                        })
                    }
                    Err(unwind_error) => {
                        tracing::error!(
                            error = %unwind_error,
                            "Orphaned entry unwind unconfirmed; open exposure"
                        );
                        Err(PlacementFailure::StopOrphaned {
                            stop_error,
                            unwind_error,
                        })
                    }
                }
            }
        }
    }

    /// Close a just-filled entry with a bounded-retry market order
    async fn unwind_entry(&self, entry_spec: &OrderSpec) -> Result<Decimal, BrokerError> {
        let mut last_err = BrokerError::Timeout;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(self.config.retry_backoff_ms * attempt as u64);
                tokio::time::sleep(backoff).await;
            }

            let close_spec = OrderSpec::new(
                entry_spec.instrument.clone(),
                entry_spec.side.opposite(),
                OrderKind::Market,
                entry_spec.quantity,
                entry_spec.price,
            );
            match submit_confirmed(&*self.broker, &self.config, &close_spec, true).await {
                Ok(order) => return Ok(order.spec.price),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Unwind attempt failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}
