//! Pre-trade safety gate
//!
//! Ordered, short-circuiting admission checks. Every check must pass for a
//! signal to be admitted; the first failure names the reason. The gate never
//! partially admits and never mutates anything.

use super::ledger::RiskLedger;
use super::types::RejectReason;
use crate::market::MarketSnapshot;
use crate::signal::TradeSignal;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// All checks passed
    Admit,
    /// First failing check
    Reject(RejectReason),
}

impl Admission {
    /// True when the signal was admitted
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admit)
    }
}

/// Position-slot availability as seen by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// A slot is free and reserved for this entry
    Free,
    /// Every slot is occupied
    Full,
    /// A live position already holds this instrument
    Conflict,
}

/// Admission gate thresholds
#[derive(Debug, Clone)]
pub struct SafetyGate {
    min_confidence: Decimal,
    staleness_timeout_secs: u64,
    max_spread: Decimal,
}

impl SafetyGate {
    /// Create a gate with the given thresholds
    pub fn new(min_confidence: Decimal, staleness_timeout_secs: u64, max_spread: Decimal) -> Self {
        Self {
            min_confidence,
            staleness_timeout_secs,
            max_spread,
        }
    }

    /// Evaluate a signal for admission.
    ///
    /// Check order, first failure wins: market open, tradeable signal,
    /// confidence, slot availability, ledger lock/day-cap, cooldown, market
    /// data health. Stale or wide-spread data blocks entries with the same
    /// thresholds that force exits.
    pub fn evaluate(
        &self,
        signal: &TradeSignal,
        ledger: &RiskLedger,
        market_open: bool,
        slot: SlotState,
        snapshot: Option<&MarketSnapshot>,
        now: DateTime<Utc>,
    ) -> Admission {
        if !market_open {
            return Admission::Reject(RejectReason::MarketClosed);
        }

        if !signal.direction.is_tradeable() || signal.entry_price <= Decimal::ZERO {
            return Admission::Reject(RejectReason::NoTradeSignal);
        }
        if signal.confidence < self.min_confidence {
            return Admission::Reject(RejectReason::LowConfidence);
        }

        match slot {
            SlotState::Free => {}
            SlotState::Full => return Admission::Reject(RejectReason::SlotOccupied),
            SlotState::Conflict => return Admission::Reject(RejectReason::ConflictingPosition),
        }

        if ledger.is_locked(now) || ledger.day_limit_reached() {
            return Admission::Reject(RejectReason::RiskLimitReached);
        }
        if ledger.in_cooldown(now) {
            return Admission::Reject(RejectReason::InCooldown);
        }

        match snapshot {
            None => return Admission::Reject(RejectReason::UnhealthyMarketData),
            Some(snap) => {
                if snap.is_stale(now, self.staleness_timeout_secs)
                    || snap.spread() > self.max_spread
                {
                    return Admission::Reject(RejectReason::UnhealthyMarketData);
                }
            }
        }

        Admission::Admit
    }
}
