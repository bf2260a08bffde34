//! Circuit breaker for coordinator and broker failures
//!
//! Counts consecutive failures across order placements and emergency exits.
//! At the threshold it trips and stays tripped until an explicit reset; the
//! orchestrator reacts to a trip by activating the kill switch, whose ledger
//! lock owns the recovery timer.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Lock-free consecutive-failure breaker
pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: AtomicU32,
    tripped: AtomicBool,
    total_trips: AtomicU32,
}

impl CircuitBreaker {
    /// Create a breaker that trips after `threshold` consecutive failures
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
            tripped: AtomicBool::new(false),
            total_trips: AtomicU32::new(0),
        }
    }

    /// Whether the breaker is currently tripped
    #[inline]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Current consecutive-failure count
    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Times the breaker has tripped since construction
    pub fn total_trips(&self) -> u32 {
        self.total_trips.load(Ordering::Relaxed)
    }

    /// Record a successful operation, resetting the streak
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Record a failed operation.
    ///
    /// Returns true when this failure tripped the breaker.
    pub fn record_failure(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.threshold {
            return self.trip();
        }
        false
    }

    /// Trip immediately. Returns true when the breaker was not already tripped.
    pub fn trip(&self) -> bool {
        let newly = !self.tripped.swap(true, Ordering::AcqRel);
        if newly {
            self.total_trips.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                failures = self.failure_count(),
                "Circuit breaker tripped"
            );
        }
        newly
    }

    /// Reset to closed state, clearing the streak
    pub fn reset(&self) {
        self.tripped.store(false, Ordering::Release);
        self.consecutive_failures.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_breaker() {
        let breaker = CircuitBreaker::new(3);
        assert!(!breaker.is_tripped());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_trips_at_threshold() {
        let breaker = CircuitBreaker::new(3);
        assert!(!breaker.record_failure());
        assert!(!breaker.record_failure());
        assert!(breaker.record_failure());
        assert!(breaker.is_tripped());
    }

    #[test]
    fn test_success_resets_streak() {
        let breaker = CircuitBreaker::new(3);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);

        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_tripped());
    }

    #[test]
    fn test_trip_once_counted_once() {
        let breaker = CircuitBreaker::new(1);
        assert!(breaker.trip());
        assert!(!breaker.trip());
        assert_eq!(breaker.total_trips(), 1);
    }

    #[test]
    fn test_reset_closes() {
        let breaker = CircuitBreaker::new(1);
        breaker.record_failure();
        assert!(breaker.is_tripped());

        breaker.reset();
        assert!(!breaker.is_tripped());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_threshold_minimum_one() {
        let breaker = CircuitBreaker::new(0);
        assert!(breaker.record_failure());
    }
}
