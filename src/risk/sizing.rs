//! Position sizing and price calculation
//!
//! Pure functions: quantity from a fixed risk budget, stop placement from a
//! structural reference with a percentage fallback, and a conservative
//! fixed-offset target. No I/O, unit-testable in isolation.

use super::types::SizingError;
use crate::config::SizingConfig;
use crate::signal::Direction;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Quantity in lots such that a stop-out loses at most `risk_amount`.
///
/// `floor(risk / (|entry - stop| * lot_multiplier))`, rejected when even a
/// single lot would exceed the budget.
pub fn size_position(
    entry_price: Decimal,
    stop_price: Decimal,
    risk_amount: Decimal,
    lot_multiplier: Decimal,
) -> Result<u32, SizingError> {
    if entry_price <= Decimal::ZERO || stop_price <= Decimal::ZERO {
        return Err(SizingError::NonPositivePrice);
    }
    if risk_amount <= Decimal::ZERO {
        return Err(SizingError::NonPositiveRisk);
    }

    let distance = (entry_price - stop_price).abs();
    if distance.is_zero() {
        return Err(SizingError::ZeroStopDistance);
    }

    let per_lot_risk = distance * lot_multiplier;
    let quantity = (risk_amount / per_lot_risk).floor();
    if quantity < Decimal::ONE {
        return Err(SizingError::RiskBudgetTooSmall);
    }

    // floor() of a positive Decimal always fits u32 at sane budgets
    quantity
        .to_u32()
        .ok_or(SizingError::RiskBudgetTooSmall)
}

/// Stop price for an entry, preferring the structural reference.
///
/// The structural level wins when it sits on the protective side of the
/// entry and its distance falls within the configured band; otherwise the
/// fixed-percentage fallback applies.
pub fn compute_stop(
    entry_price: Decimal,
    structural_reference: Option<Decimal>,
    direction: Direction,
    config: &SizingConfig,
) -> Decimal {
    if let Some(level) = structural_reference {
        let distance = match direction {
            Direction::Long => entry_price - level,
            Direction::Short => level - entry_price,
            Direction::Hold => Decimal::ZERO,
        };
        let min = entry_price * config.min_stop_distance_pct;
        let max = entry_price * config.max_stop_distance_pct;
        if distance >= min && distance <= max {
            return level;
        }
    }

    match direction {
        Direction::Long => entry_price * (Decimal::ONE - config.fallback_stop_pct),
        Direction::Short => entry_price * (Decimal::ONE + config.fallback_stop_pct),
        Direction::Hold => entry_price,
    }
}

/// Target price as a plain offset from entry
pub fn compute_target(entry_price: Decimal, direction: Direction, target_pct: Decimal) -> Decimal {
    match direction {
        Direction::Long => entry_price * (Decimal::ONE + target_pct),
        Direction::Short => entry_price * (Decimal::ONE - target_pct),
        Direction::Hold => entry_price,
    }
}
