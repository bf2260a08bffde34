//! Paper trading broker
//!
//! Simulated broker with deterministic fills: market and limit orders fill
//! instantly at the spec price, stop orders rest as placed. Failures can be
//! scripted per submission so coordination and recovery paths are testable
//! without a network.

use super::{BrokerClient, BrokerError, OrderId, OrderKind, OrderSpec, OrderStatus};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct PaperOrder {
    spec: OrderSpec,
    status: OrderStatus,
}

#[derive(Default)]
struct PaperState {
    orders: HashMap<OrderId, PaperOrder>,
    /// Scripted outcomes consumed one per submission; empty queue means accept
    submit_script: VecDeque<SubmitOutcome>,
    fail_cancels: bool,
    submissions: u32,
}

/// Scripted outcome for a single submission
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Accept and fill/rest normally
    Accept,
    /// Return the given error; the broker keeps no record
    Fail(BrokerError),
    /// Return a timeout, but record the order as executed anyway
    /// (transport drop after acceptance)
    TimeoutButExecuted,
}

/// Paper trading broker with simulated fills
pub struct PaperBroker {
    state: Arc<Mutex<PaperState>>,
}

impl PaperBroker {
    /// Create a new paper broker
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PaperState::default())),
        }
    }

    /// Script outcomes for upcoming submissions, consumed in order
    pub async fn script_submits(&self, outcomes: Vec<SubmitOutcome>) {
        let mut state = self.state.lock().await;
        state.submit_script.extend(outcomes);
    }

    /// Make subsequent cancel calls fail
    pub async fn fail_cancels(&self, fail: bool) {
        let mut state = self.state.lock().await;
        state.fail_cancels = fail;
    }

    /// Number of submissions seen so far
    pub async fn submission_count(&self) -> u32 {
        let state = self.state.lock().await;
        state.submissions
    }

    /// Statuses of every order the broker has a record of
    pub async fn order_statuses(&self) -> Vec<(OrderId, OrderStatus)> {
        let state = self.state.lock().await;
        state
            .orders
            .values()
            .map(|o| (o.spec.client_id, o.status))
            .collect()
    }

    /// Count of orders currently resting or filled (non-terminal rejects excluded)
    pub async fn live_order_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .orders
            .values()
            .filter(|o| matches!(o.status, OrderStatus::Placed | OrderStatus::Executed))
            .count()
    }

    fn fill_status(kind: OrderKind) -> OrderStatus {
        match kind {
            // Stops rest until triggered; everything else fills immediately
            OrderKind::Stop => OrderStatus::Placed,
            OrderKind::Market | OrderKind::Limit => OrderStatus::Executed,
        }
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn submit_order(&self, spec: &OrderSpec) -> Result<OrderId, BrokerError> {
        let mut state = self.state.lock().await;
        state.submissions += 1;

        let outcome = state.submit_script.pop_front().unwrap_or(SubmitOutcome::Accept);
        match outcome {
            SubmitOutcome::Accept => {
                let status = Self::fill_status(spec.kind);
                state.orders.insert(
                    spec.client_id,
                    PaperOrder {
                        spec: spec.clone(),
                        status,
                    },
                );
                tracing::info!(order_id = %spec.client_id, ?status, "Paper order accepted");
                Ok(spec.client_id)
            }
            SubmitOutcome::Fail(err) => {
                tracing::warn!(order_id = %spec.client_id, error = %err, "Paper order failed");
                Err(err)
            }
            SubmitOutcome::TimeoutButExecuted => {
                state.orders.insert(
                    spec.client_id,
                    PaperOrder {
                        spec: spec.clone(),
                        status: OrderStatus::Executed,
                    },
                );
                tracing::warn!(order_id = %spec.client_id, "Paper order timed out after acceptance");
                Err(BrokerError::Timeout)
            }
        }
    }

    async fn cancel_order(&self, id: OrderId) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        if state.fail_cancels {
            return Err(BrokerError::Transport("cancel failed".into()));
        }
        match state.orders.get_mut(&id) {
            Some(order) if !order.status.is_terminal() => {
                order.status = OrderStatus::Cancelled;
                tracing::info!(order_id = %id, "Paper order cancelled");
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(BrokerError::UnknownOrder(id)),
        }
    }

    async fn query_status(&self, id: OrderId) -> Result<OrderStatus, BrokerError> {
        let state = self.state.lock().await;
        state
            .orders
            .get(&id)
            .map(|o| o.status)
            .ok_or(BrokerError::UnknownOrder(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::OrderSide;
    use rust_decimal_macros::dec;

    fn market_spec() -> OrderSpec {
        OrderSpec::new("NIFTY24500CE", OrderSide::Buy, OrderKind::Market, 1, dec!(100))
    }

    fn stop_spec() -> OrderSpec {
        OrderSpec::new("NIFTY24500CE", OrderSide::Sell, OrderKind::Stop, 1, dec!(95))
    }

    #[tokio::test]
    async fn test_market_order_fills_immediately() {
        let broker = PaperBroker::new();
        let spec = market_spec();

        let id = broker.submit_order(&spec).await.unwrap();
        assert_eq!(id, spec.client_id);
        assert_eq!(broker.query_status(id).await.unwrap(), OrderStatus::Executed);
    }

    #[tokio::test]
    async fn test_stop_order_rests() {
        let broker = PaperBroker::new();
        let spec = stop_spec();

        let id = broker.submit_order(&spec).await.unwrap();
        assert_eq!(broker.query_status(id).await.unwrap(), OrderStatus::Placed);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let broker = PaperBroker::new();
        broker
            .script_submits(vec![SubmitOutcome::Fail(BrokerError::Rejected("margin".into()))])
            .await;

        let spec = market_spec();
        let result = broker.submit_order(&spec).await;
        assert!(matches!(result, Err(BrokerError::Rejected(_))));

        // No record kept for a rejected submission
        assert!(matches!(
            broker.query_status(spec.client_id).await,
            Err(BrokerError::UnknownOrder(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_but_executed_is_queryable() {
        let broker = PaperBroker::new();
        broker.script_submits(vec![SubmitOutcome::TimeoutButExecuted]).await;

        let spec = market_spec();
        assert!(matches!(broker.submit_order(&spec).await, Err(BrokerError::Timeout)));
        assert_eq!(
            broker.query_status(spec.client_id).await.unwrap(),
            OrderStatus::Executed
        );
    }

    #[tokio::test]
    async fn test_cancel_resting_order() {
        let broker = PaperBroker::new();
        let spec = stop_spec();
        let id = broker.submit_order(&spec).await.unwrap();

        broker.cancel_order(id).await.unwrap();
        assert_eq!(broker.query_status(id).await.unwrap(), OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_executed_order_is_noop() {
        let broker = PaperBroker::new();
        let spec = market_spec();
        let id = broker.submit_order(&spec).await.unwrap();

        broker.cancel_order(id).await.unwrap();
        assert_eq!(broker.query_status(id).await.unwrap(), OrderStatus::Executed);
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let broker = PaperBroker::new();
        let result = broker.cancel_order(OrderId::new_v4()).await;
        assert!(matches!(result, Err(BrokerError::UnknownOrder(_))));
    }

    #[tokio::test]
    async fn test_submission_count() {
        let broker = PaperBroker::new();
        broker.submit_order(&market_spec()).await.unwrap();
        broker.submit_order(&stop_spec()).await.unwrap();
        assert_eq!(broker.submission_count().await, 2);
    }
}
