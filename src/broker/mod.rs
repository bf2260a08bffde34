//! Brokerage interface module
//!
//! Narrow order/quote seam to the external brokerage client. Transport,
//! authentication, and wire formats live behind implementations of
//! [`BrokerClient`].

mod paper;
mod types;

pub use paper::{PaperBroker, SubmitOutcome};
pub use types::{OrderId, OrderKind, OrderSide, OrderSpec, OrderStatus};

use async_trait::async_trait;
use thiserror::Error;

/// Broker call errors
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// Call did not complete within the configured timeout
    #[error("broker call timed out")]
    Timeout,
    /// Broker refused the order
    #[error("order rejected: {0}")]
    Rejected(String),
    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(String),
    /// Broker has no record of the order
    #[error("unknown order: {0}")]
    UnknownOrder(OrderId),
}

/// Trait for brokerage client implementations
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Submit an order; the broker echoes the client-assigned id on acceptance
    async fn submit_order(&self, spec: &OrderSpec) -> Result<OrderId, BrokerError>;
    /// Cancel a resting order
    async fn cancel_order(&self, id: OrderId) -> Result<(), BrokerError>;
    /// Query current lifecycle status of an order
    async fn query_status(&self, id: OrderId) -> Result<OrderStatus, BrokerError>;
}
