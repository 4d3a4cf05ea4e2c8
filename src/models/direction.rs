//! # models::direction
//!
//! Defines [`Direction`] — which side of the market the ladder accumulates —
//! together with the static [`DirectionRules`] table that every
//! direction-dependent decision reads from.
//!
//! All sign conventions live in this one table.  Nothing else in the crate
//! branches on the direction to pick an operator or an order side.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{OrderSide, PositionSnapshot};

// ─── Direction ────────────────────────────────────────────────────────────────

/// The side the controller builds.  Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

// ─── Rules Table ──────────────────────────────────────────────────────────────

/// Sign and comparison rules for one [`Direction`].
#[derive(Debug)]
pub struct DirectionRules {
    /// Multiplier from directional volume to signed volume.
    pub volume_sign: i64,
    /// Multiplier applied to the price step when the ladder advances.
    pub step_sign: Decimal,
    /// Side that adds exposure.
    pub open_side: OrderSide,
    /// Side that removes exposure.
    pub close_side: OrderSide,
    /// `true` once `price` has moved through `target` in the adverse direction.
    pub crossed: fn(price: Decimal, target: Decimal) -> bool,
    /// Reads the volume held on this side from a position snapshot.
    pub held: fn(&PositionSnapshot) -> u64,
}

const LONG_RULES: DirectionRules = DirectionRules {
    volume_sign: 1,
    step_sign:   Decimal::NEGATIVE_ONE,
    open_side:   OrderSide::Buy,
    close_side:  OrderSide::Sell,
    crossed:     |price, target| price <= target,
    held:        |p| p.volume_long,
};

const SHORT_RULES: DirectionRules = DirectionRules {
    volume_sign: -1,
    step_sign:   Decimal::ONE,
    open_side:   OrderSide::Sell,
    close_side:  OrderSide::Buy,
    crossed:     |price, target| price >= target,
    held:        |p| p.volume_short,
};

impl Direction {
    #[inline]
    pub fn rules(self) -> &'static DirectionRules {
        match self {
            Direction::Long  => &LONG_RULES,
            Direction::Short => &SHORT_RULES,
        }
    }

    /// Signed position for this side: positive for LONG, negative for SHORT.
    /// Saturates at `i64::MAX` lots.
    #[inline]
    pub fn signed_volume(self, position: &PositionSnapshot) -> i64 {
        let rules = self.rules();
        let held = i64::try_from((rules.held)(position)).unwrap_or(i64::MAX);
        rules.volume_sign * held
    }

    /// Unsigned volume held on this side.
    #[inline]
    pub fn held_volume(self, position: &PositionSnapshot) -> u64 {
        (self.rules().held)(position)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long  => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    /// Case-insensitive; accepts the order-side spellings as aliases.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "long" | "buy"   => Ok(Direction::Long),
            "short" | "sell" => Ok(Direction::Short),
            other => Err(format!("unknown direction '{other}', use 'long' or 'short'")),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
