//! Day-scoped risk ledger
//!
//! Tracks today's completed trades, loss totals, and consecutive-loss
//! streak, and owns the lock state that throttles new entries. Transitions
//! are monotonic within a day: once locked, only timer expiry or an
//! explicit day reset unlocks, and loss totals are never silently cleared.

use crate::config::RiskConfig;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why the ledger is locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockReason {
    /// Cumulative daily loss reached the limit
    DailyLossLimit,
    /// Consecutive-loss streak reached the limit
    ConsecutiveLosses,
    /// Kill switch flattened the book
    KillSwitch,
    /// Operator lock
    Manual,
}

impl std::fmt::Display for LockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockReason::DailyLossLimit => write!(f, "daily loss limit"),
            LockReason::ConsecutiveLosses => write!(f, "consecutive losses"),
            LockReason::KillSwitch => write!(f, "kill switch"),
            LockReason::Manual => write!(f, "manual lock"),
        }
    }
}

/// Ledger lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// Trading allowed
    Unlocked,
    /// Post-loss cooldown until the given instant
    Cooldown { until: DateTime<Utc> },
    /// Hard lock until the given instant
    Locked {
        until: DateTime<Utc>,
        reason: LockReason,
    },
}

/// Process-wide risk state for one trading day
#[derive(Debug, Clone)]
pub struct RiskLedger {
    config: RiskConfig,
    trades_today: u32,
    daily_loss: Decimal,
    daily_pnl: Decimal,
    consecutive_losses: u32,
    lock: LockState,
}

impl RiskLedger {
    /// Create a fresh ledger for the session
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            trades_today: 0,
            daily_loss: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            consecutive_losses: 0,
            lock: LockState::Unlocked,
        }
    }

    /// Record one completed trade result and apply threshold transitions
    pub fn record_result(&mut self, pnl: Decimal, now: DateTime<Utc>) {
        self.trades_today += 1;
        self.daily_pnl += pnl;

        if pnl < Decimal::ZERO {
            self.daily_loss += -pnl;
            self.consecutive_losses += 1;
            self.start_cooldown(Duration::minutes(self.config.cooldown_minutes as i64), now);

            if self.daily_loss >= self.config.max_daily_loss {
                self.lock(
                    Duration::minutes(self.config.loss_lock_minutes as i64),
                    LockReason::DailyLossLimit,
                    now,
                );
            } else if self.consecutive_losses >= self.config.max_consecutive_losses {
                self.lock(
                    Duration::minutes(self.config.loss_lock_minutes as i64),
                    LockReason::ConsecutiveLosses,
                    now,
                );
            }
        } else {
            self.consecutive_losses = 0;
        }

        tracing::info!(
            pnl = %pnl,
            trades_today = self.trades_today,
            daily_loss = %self.daily_loss,
            streak = self.consecutive_losses,
            lock = ?self.lock,
            "Risk ledger updated"
        );
    }

    /// Whether a new entry is allowed right now
    pub fn can_trade(&self, now: DateTime<Utc>) -> bool {
        if self.trades_today >= self.config.max_trades_per_day {
            return false;
        }
        match self.lock {
            LockState::Unlocked => true,
            LockState::Cooldown { until } | LockState::Locked { until, .. } => now >= until,
        }
    }

    /// Whether a hard lock is active (excludes cooldown)
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lock, LockState::Locked { until, .. } if now < until)
    }

    /// Whether the day-trade cap has been reached
    pub fn day_limit_reached(&self) -> bool {
        self.trades_today >= self.config.max_trades_per_day
    }

    /// Whether a post-loss cooldown is active
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lock, LockState::Cooldown { until } if now < until)
    }

    /// Start (or extend) a cooldown; never downgrades a hard lock
    pub fn start_cooldown(&mut self, duration: Duration, now: DateTime<Utc>) {
        let until = now + duration;
        match self.lock {
            LockState::Locked { .. } => {}
            LockState::Cooldown { until: existing } if existing >= until => {}
            _ => self.lock = LockState::Cooldown { until },
        }
    }

    /// Apply a hard lock; re-locking keeps the later expiry
    pub fn lock(&mut self, duration: Duration, reason: LockReason, now: DateTime<Utc>) {
        let until = now + duration;
        match self.lock {
            LockState::Locked {
                until: existing, ..
            } if existing >= until => {}
            _ => {
                tracing::warn!(%reason, %until, "Risk ledger locked");
                self.lock = LockState::Locked { until, reason };
            }
        }
    }

    /// Reset all counters and unlock for a new trading day
    pub fn reset_for_new_day(&mut self, now: DateTime<Utc>) {
        tracing::info!(%now, "Risk ledger reset for new day");
        self.trades_today = 0;
        self.daily_loss = Decimal::ZERO;
        self.daily_pnl = Decimal::ZERO;
        self.consecutive_losses = 0;
        self.lock = LockState::Unlocked;
    }

    /// Expiry of the current lock or cooldown, if any
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        match self.lock {
            LockState::Unlocked => None,
            LockState::Cooldown { until } | LockState::Locked { until, .. } => Some(until),
        }
    }

    /// Completed trades today
    pub fn trades_today(&self) -> u32 {
        self.trades_today
    }

    /// Cumulative losses today (positive number)
    pub fn daily_loss(&self) -> Decimal {
        self.daily_loss
    }

    /// Net P&L today
    pub fn daily_pnl(&self) -> Decimal {
        self.daily_pnl
    }

    /// Current consecutive-loss streak
    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    /// Current lock state
    pub fn lock_state(&self) -> LockState {
        self.lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_config() -> RiskConfig {
        RiskConfig {
            risk_per_trade: dec!(500),
            max_trades_per_day: 5,
            max_daily_loss: dec!(1500),
            cooldown_minutes: 15,
            max_consecutive_losses: 3,
            loss_lock_minutes: 240,
            max_concurrent_positions: 1,
        }
    }

    #[test]
    fn test_fresh_ledger_can_trade() {
        let ledger = RiskLedger::new(test_config());
        assert!(ledger.can_trade(Utc::now()));
        assert_eq!(ledger.trades_today(), 0);
        assert_eq!(ledger.lock_state(), LockState::Unlocked);
    }

    #[test]
    fn test_win_resets_streak() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.record_result(dec!(-100), now);
        assert_eq!(ledger.consecutive_losses(), 1);

        ledger.record_result(dec!(250), now);
        assert_eq!(ledger.consecutive_losses(), 0);
        // Loss total is never cleared by a win
        assert_eq!(ledger.daily_loss(), dec!(100));
        assert_eq!(ledger.daily_pnl(), dec!(150));
    }

    #[test]
    fn test_loss_starts_cooldown() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.record_result(dec!(-100), now);
        assert!(ledger.in_cooldown(now));
        assert!(!ledger.can_trade(now));

        // Expired after the window
        let later = now + Duration::minutes(16);
        assert!(!ledger.in_cooldown(later));
        assert!(ledger.can_trade(later));
    }

    #[test]
    fn test_daily_loss_limit_locks() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.record_result(dec!(-800), now);
        assert!(!ledger.is_locked(now));

        ledger.record_result(dec!(-700), now);
        assert!(ledger.is_locked(now));
        assert!(matches!(
            ledger.lock_state(),
            LockState::Locked {
                reason: LockReason::DailyLossLimit,
                ..
            }
        ));
        assert!(!ledger.can_trade(now + Duration::minutes(30)));
        assert!(ledger.can_trade(now + Duration::minutes(241)));
    }

    #[test]
    fn test_consecutive_losses_lock() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.record_result(dec!(-100), now);
        ledger.record_result(dec!(-100), now);
        assert!(!ledger.is_locked(now));

        ledger.record_result(dec!(-100), now);
        assert!(matches!(
            ledger.lock_state(),
            LockState::Locked {
                reason: LockReason::ConsecutiveLosses,
                ..
            }
        ));
    }

    #[test]
    fn test_day_trade_cap() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        for _ in 0..5 {
            ledger.record_result(dec!(50), now);
        }
        assert!(ledger.day_limit_reached());
        assert!(!ledger.can_trade(now));
        // The cap holds regardless of lock expiry
        assert!(!ledger.can_trade(now + Duration::hours(10)));
    }

    #[test]
    fn test_lock_idempotent_keeps_later_expiry() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.lock(Duration::minutes(120), LockReason::KillSwitch, now);
        let first = ledger.locked_until().unwrap();

        // Second activation a moment later must not shorten the window
        ledger.lock(Duration::minutes(120), LockReason::KillSwitch, now + Duration::seconds(30));
        let second = ledger.locked_until().unwrap();
        assert!(second >= first);
        assert!(!ledger.can_trade(now + Duration::minutes(60)));

        // Re-locking with a shorter window changes nothing
        ledger.lock(Duration::minutes(1), LockReason::Manual, now);
        assert_eq!(ledger.locked_until().unwrap(), second);
    }

    #[test]
    fn test_cooldown_never_downgrades_lock() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.lock(Duration::minutes(240), LockReason::DailyLossLimit, now);
        ledger.start_cooldown(Duration::minutes(15), now);

        assert!(matches!(ledger.lock_state(), LockState::Locked { .. }));
    }

    #[test]
    fn test_reset_for_new_day() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.record_result(dec!(-1600), now);
        assert!(ledger.is_locked(now));

        ledger.reset_for_new_day(now);
        assert!(ledger.can_trade(now));
        assert_eq!(ledger.trades_today(), 0);
        assert_eq!(ledger.daily_loss(), dec!(0));
        assert_eq!(ledger.consecutive_losses(), 0);
    }

    #[test]
    fn test_lock_expiry_allows_trading() {
        let mut ledger = RiskLedger::new(test_config());
        let now = Utc::now();

        ledger.lock(Duration::minutes(10), LockReason::Manual, now);
        assert!(!ledger.can_trade(now));
        assert!(ledger.can_trade(now + Duration::minutes(11)));
    }
}
