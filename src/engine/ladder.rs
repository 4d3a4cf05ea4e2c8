//! # engine::ladder
//!
//! [`LadderState`] — the mutable decision state of one run — and the
//! [`VolumeProgression`] policy that decides how an entry reaches the
//! exchange.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ConfigError;
use crate::models::Direction;

// ─── Params ───────────────────────────────────────────────────────────────────

/// Immutable run parameters, read once at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderParams {
    pub instrument: String,
    pub direction: Direction,
    /// Floating profit at which the whole position is closed.
    pub target_profit: Decimal,
    /// Largest committed fraction of equity that still admits an entry.
    pub max_position_ratio: Decimal,
    pub progression: VolumeProgression,
    /// `None` waits for order confirmation indefinitely.
    pub confirm_timeout: Option<Duration>,
}

// ─── Volume Progression ───────────────────────────────────────────────────────

/// How an entry or close is expressed to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeProgression {
    /// Explicit open/close limit orders of `volume_step` lots; the controller
    /// waits for each to reach terminal status.
    FixedIncrement,
    /// Absolute signed target handed to the gateway, which works the orders.
    TargetVolume,
}

impl FromStr for VolumeProgression {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "order" | "fixed" | "fixed_increment" => Ok(VolumeProgression::FixedIncrement),
            "target" | "target_volume"            => Ok(VolumeProgression::TargetVolume),
            other => Err(format!("unknown volume mode '{other}', use 'order' or 'target'")),
        }
    }
}

// ─── Ladder State ─────────────────────────────────────────────────────────────

/// Current rung of the ladder.
///
/// Invariant: `price_step > 0` and `volume_step > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LadderState {
    target_price: Decimal,
    price_step: Decimal,
    volume_step: u64,
}

impl LadderState {
    pub fn new(
        target_price: Decimal,
        price_step: Decimal,
        volume_step: u64,
    ) -> Result<Self, ConfigError> {
        if price_step <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "LADDER_PRICE_STEP",
                reason: format!("must be > 0, got {price_step}"),
            });
        }
        if volume_step == 0 || i64::try_from(volume_step).is_err() {
            return Err(ConfigError::Invalid {
                key: "LADDER_VOLUME_STEP",
                reason: format!("must be within 1..={}, got {volume_step}", i64::MAX),
            });
        }
        Ok(Self { target_price, price_step, volume_step })
    }

    #[inline]
    pub fn target_price(&self) -> Decimal {
        self.target_price
    }

    #[inline]
    pub fn price_step(&self) -> Decimal {
        self.price_step
    }

    #[inline]
    pub fn volume_step(&self) -> u64 {
        self.volume_step
    }

    /// Has `price` reached the current rung?
    #[inline]
    pub fn is_crossed(&self, direction: Direction, price: Decimal) -> bool {
        (direction.rules().crossed)(price, self.target_price)
    }

    /// Signed position requested by the next entry, `None` if it does not
    /// fit in an `i64`.
    #[inline]
    pub fn next_volume(&self, direction: Direction, signed_current: i64) -> Option<i64> {
        let step = i64::try_from(self.volume_step).ok()?;
        signed_current.checked_add(direction.rules().volume_sign * step)
    }

    /// Move the rung one step further into adversity.  Returns the new target.
    pub fn advance(&mut self, direction: Direction) -> Decimal {
        self.target_price += direction.rules().step_sign * self.price_step;
        self.target_price
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
