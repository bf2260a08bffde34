//! Execution types

use crate::broker::{BrokerError, OrderSpec, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-side record of one order leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerOrder {
    /// The submitted spec
    pub spec: OrderSpec,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// When the order was submitted
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the broker confirmed the terminal/resting status
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl BrokerOrder {
    /// Create a pending record for a spec about to be submitted
    pub fn new(spec: OrderSpec) -> Self {
        Self {
            spec,
            status: OrderStatus::Pending,
            submitted_at: None,
            confirmed_at: None,
        }
    }

    /// Create a record already in the given status
    pub fn with_status(spec: OrderSpec, status: OrderStatus) -> Self {
        let now = Utc::now();
        Self {
            spec,
            status,
            submitted_at: Some(now),
            confirmed_at: status.is_terminal().then_some(now),
        }
    }

    /// Record a status change
    pub fn mark(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        if self.submitted_at.is_none() {
            self.submitted_at = Some(now);
        }
        if status.is_terminal() || status == OrderStatus::Placed {
            self.confirmed_at = Some(now);
        }
        self.status = status;
    }
}

/// Legs that do not form a confirmed pair
#[derive(Debug, Clone, Copy, Error)]
pub enum PairError {
    #[error("entry leg not executed")]
    EntryNotExecuted,
    #[error("stop leg not acknowledged")]
    StopNotAcknowledged,
}

/// A fully placed entry + protective-stop pair.
///
/// Constructible only through [`LinkedOrderPair::confirm`], which requires
/// the entry executed and the stop acknowledged. There is no way to build a
/// value representing a half-placed pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedOrderPair {
    entry: BrokerOrder,
    stop: BrokerOrder,
}

impl LinkedOrderPair {
    /// Bind both legs, verifying their confirmation states
    pub fn confirm(entry: BrokerOrder, stop: BrokerOrder) -> Result<Self, PairError> {
        if entry.status != OrderStatus::Executed {
            return Err(PairError::EntryNotExecuted);
        }
        if !matches!(stop.status, OrderStatus::Placed | OrderStatus::Executed) {
            return Err(PairError::StopNotAcknowledged);
        }
        Ok(Self { entry, stop })
    }

    /// The executed entry leg
    pub fn entry(&self) -> &BrokerOrder {
        &self.entry
    }

    /// The resting protective-stop leg
    pub fn stop(&self) -> &BrokerOrder {
        &self.stop
    }
}

/// Why a two-leg placement failed
#[derive(Debug, Error)]
pub enum PlacementFailure {
    /// Entry leg failed; nothing was created
    #[error("entry leg failed: {0}")]
    Entry(BrokerError),
    /// Stop leg failed; the entry leg was closed by the unwind before returning
    #[error("stop leg failed ({stop_error}); entry unwound at {exit_price}")]
    StopUnwound {
        stop_error: BrokerError,
        exit_price: Decimal,
    },
    /// Stop leg failed and the unwind could not confirm closure of the entry.
    /// Fatal: open exposure exists without a protective stop.
    #[error("stop leg failed ({stop_error}); entry unwind unconfirmed: {unwind_error}")]
    StopOrphaned {
        stop_error: BrokerError,
        unwind_error: BrokerError,
    },
}

impl PlacementFailure {
    /// True when the failure left exposure the engine could not resolve
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlacementFailure::StopOrphaned { .. })
    }
}
