//! # models::account
//!
//! Account and position snapshots as reported by the gateway.  Both are
//! superseded on every update; the controller never keeps a history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Funds view of the trading account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account equity.
    pub balance: Decimal,
    /// Funds not committed as margin.
    pub available: Decimal,
    /// Unrealised P&L of the open position, marked to the latest price.
    pub floating_profit: Decimal,
}

/// Lots held per side for one instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub volume_long: u64,
    pub volume_short: u64,
}

impl PositionSnapshot {
    /// Snapshot holding exactly `signed` lots: positive on the long side,
    /// negative on the short side.
    pub fn from_signed(signed: i64) -> Self {
        if signed >= 0 {
            Self { volume_long: signed as u64, volume_short: 0 }
        } else {
            Self { volume_long: 0, volume_short: signed.unsigned_abs() }
        }
    }
}
