//! Market snapshot types
//!
//! Per-tick numeric outputs of the market-data/Greeks subsystem.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single market update for the monitored instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Last traded premium
    pub last_price: Decimal,
    /// Best bid
    pub bid: Decimal,
    /// Best ask
    pub ask: Decimal,
    /// Option delta
    pub delta: Decimal,
    /// Option gamma
    pub gamma: Decimal,
    /// Option theta (negative for long premium)
    pub theta: Decimal,
    /// Snapshot timestamp
    pub timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Current bid/ask spread in premium points
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Age of the snapshot relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    /// True when the snapshot is older than `timeout_secs`
    pub fn is_stale(&self, now: DateTime<Utc>, timeout_secs: u64) -> bool {
        self.age(now) > Duration::seconds(timeout_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot_at(ts: DateTime<Utc>) -> MarketSnapshot {
        MarketSnapshot {
            last_price: dec!(100),
            bid: dec!(99.5),
            ask: dec!(100.5),
            delta: dec!(0.45),
            gamma: dec!(0.002),
            theta: dec!(-8.5),
            timestamp: ts,
        }
    }

    #[test]
    fn test_spread() {
        let snap = snapshot_at(Utc::now());
        assert_eq!(snap.spread(), dec!(1.0));
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let fresh = snapshot_at(now - Duration::seconds(5));
        assert!(!fresh.is_stale(now, 30));

        let stale = snapshot_at(now - Duration::seconds(45));
        assert!(stale.is_stale(now, 30));
    }

    #[test]
    fn test_staleness_boundary() {
        let now = Utc::now();
        let at_limit = snapshot_at(now - Duration::seconds(30));
        assert!(!at_limit.is_stale(now, 30));
    }
}
