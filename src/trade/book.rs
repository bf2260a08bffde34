//! Active-position slot table
//!
//! A fixed number of slots, each guarding at most one live trade behind its
//! own mutex. Slot locks are always acquired in index order, which keeps the
//! entry path, the tick loop, and the kill switch deadlock-free.

use super::ActiveTrade;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

/// Slot reservation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReserveError {
    /// Every slot is occupied
    #[error("no free position slot")]
    NoFreeSlot,
    /// A live trade already exists for the instrument
    #[error("conflicting position already open for instrument")]
    Conflict,
}

/// Fixed-capacity table of position slots
pub struct TradeBook {
    slots: Vec<Mutex<Option<ActiveTrade>>>,
}

impl TradeBook {
    /// Create a book with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The raw slots, for iteration by the orchestrator
    pub fn slots(&self) -> &[Mutex<Option<ActiveTrade>>] {
        &self.slots
    }

    /// Atomically reserve a free slot for `instrument`.
    ///
    /// Locks every slot (in order), rejects if any live trade already holds
    /// the instrument, and returns the guard of the first free slot with the
    /// lock still held. Holding the guard through order placement is what
    /// prevents two concurrent entries from sharing a slot.
    pub async fn reserve(
        &self,
        instrument: &str,
    ) -> Result<MutexGuard<'_, Option<ActiveTrade>>, ReserveError> {
        let mut guards = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            guards.push(slot.lock().await);
        }

        let conflict = guards
            .iter()
            .any(|g| g.as_ref().is_some_and(|t| t.instrument == instrument));
        if conflict {
            return Err(ReserveError::Conflict);
        }

        let idx = guards
            .iter()
            .position(|g| g.is_none())
            .ok_or(ReserveError::NoFreeSlot)?;
        Ok(guards.swap_remove(idx))
    }

    /// Number of occupied slots
    pub async fn occupied_count(&self) -> usize {
        let mut count = 0;
        for slot in &self.slots {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Snapshot of every live trade
    pub async fn live_trades(&self) -> Vec<ActiveTrade> {
        let mut trades = Vec::new();
        for slot in &self.slots {
            if let Some(trade) = slot.lock().await.as_ref() {
                trades.push(trade.clone());
            }
        }
        trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{OrderKind, OrderSide, OrderSpec, OrderStatus};
    use crate::execution::{BrokerOrder, LinkedOrderPair};
    use crate::signal::Direction;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn test_trade(instrument: &str) -> ActiveTrade {
        let entry = BrokerOrder::with_status(
            OrderSpec::new(instrument, OrderSide::Buy, OrderKind::Market, 1, dec!(100)),
            OrderStatus::Executed,
        );
        let stop = BrokerOrder::with_status(
            OrderSpec::new(instrument, OrderSide::Sell, OrderKind::Stop, 1, dec!(95)),
            OrderStatus::Placed,
        );
        let pair = LinkedOrderPair::confirm(entry, stop).unwrap();
        ActiveTrade::open(&pair, Direction::Long, dec!(95), dec!(110), dec!(100), Utc::now())
    }

    #[tokio::test]
    async fn test_capacity_minimum_one() {
        let book = TradeBook::new(0);
        assert_eq!(book.capacity(), 1);
    }

    #[tokio::test]
    async fn test_reserve_and_fill() {
        let book = TradeBook::new(1);
        {
            let mut guard = book.reserve("NIFTY24500CE").await.unwrap();
            *guard = Some(test_trade("NIFTY24500CE"));
        }
        assert_eq!(book.occupied_count().await, 1);
    }

    #[tokio::test]
    async fn test_reserve_full_book() {
        let book = TradeBook::new(1);
        {
            let mut guard = book.reserve("NIFTY24500CE").await.unwrap();
            *guard = Some(test_trade("NIFTY24500CE"));
        }
        let err = book.reserve("BANKNIFTY51000PE").await.unwrap_err();
        assert_eq!(err, ReserveError::NoFreeSlot);
    }

    #[tokio::test]
    async fn test_reserve_conflicting_instrument() {
        let book = TradeBook::new(2);
        {
            let mut guard = book.reserve("NIFTY24500CE").await.unwrap();
            *guard = Some(test_trade("NIFTY24500CE"));
        }
        let err = book.reserve("NIFTY24500CE").await.unwrap_err();
        assert_eq!(err, ReserveError::Conflict);

        // A different instrument still fits
        assert!(book.reserve("BANKNIFTY51000PE").await.is_ok());
    }

    #[tokio::test]
    async fn test_live_trades_snapshot() {
        let book = TradeBook::new(2);
        {
            let mut guard = book.reserve("NIFTY24500CE").await.unwrap();
            *guard = Some(test_trade("NIFTY24500CE"));
        }
        let trades = book.live_trades().await;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].instrument, "NIFTY24500CE");
    }

    #[tokio::test]
    async fn test_concurrent_reserve_single_slot() {
        use std::sync::Arc;

        let book = Arc::new(TradeBook::new(1));
        let b1 = Arc::clone(&book);
        let b2 = Arc::clone(&book);

        let t1 = tokio::spawn(async move {
            match b1.reserve("A").await {
                Ok(mut guard) => {
                    *guard = Some(test_trade("A"));
                    true
                }
                Err(_) => false,
            }
        });
        let t2 = tokio::spawn(async move {
            match b2.reserve("B").await {
                Ok(mut guard) => {
                    *guard = Some(test_trade("B"));
                    true
                }
                Err(_) => false,
            }
        });

        let (r1, r2) = (t1.await.unwrap(), t2.await.unwrap());
        // Exactly one of the two entries can win the single slot
        assert!(r1 ^ r2);
        assert_eq!(book.occupied_count().await, 1);
    }
}
