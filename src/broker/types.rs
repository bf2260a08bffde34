//! Broker order types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order identifier, assigned client-side so a timed-out submission can
/// still be reconciled by status query
pub type OrderId = Uuid;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side that closes a position opened on this side
    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Order kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Immediate execution at market
    Market,
    /// Execution at the specified price or better
    Limit,
    /// Protective stop, rests until triggered
    Stop,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created locally, not yet acknowledged
    Pending,
    /// Acknowledged by the broker, resting
    Placed,
    /// Filled
    Executed,
    /// Refused by the broker
    Rejected,
    /// Cancelled before execution
    Cancelled,
}

impl OrderStatus {
    /// True for states the order can never leave
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Executed | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }
}

/// An order to be submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Client-assigned order id
    pub client_id: OrderId,
    /// Instrument identifier
    pub instrument: String,
    /// Order side
    pub side: OrderSide,
    /// Order kind
    pub kind: OrderKind,
    /// Quantity in lots
    pub quantity: u32,
    /// Order price (trigger price for stops, reference mark for market orders)
    pub price: Decimal,
}

impl OrderSpec {
    /// Create a new spec with a fresh client id
    pub fn new(
        instrument: impl Into<String>,
        side: OrderSide,
        kind: OrderKind,
        quantity: u32,
        price: Decimal,
    ) -> Self {
        Self {
            client_id: Uuid::new_v4(),
            instrument: instrument.into(),
            side,
            kind,
            quantity,
            price,
        }
    }
}
