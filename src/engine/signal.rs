//! # engine::signal
//!
//! Pure decision for one kline of the tracked instrument.
//!
//! ## Order of checks
//! ```text
//! 1. Exit   — floating profit >= target        → Close
//! 2. Guard  — previous entry still in flight    → NoAction
//! 3. Ladder — price crossed the rung adversely? → else NoAction
//! 4. Admission — capital available?             → else NoAction
//! 5.                                            → Enter
//! ```
//! Exit always wins: when both conditions hold on the same kline only the
//! close is returned.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::engine::admission::can_open;
use crate::engine::ladder::{LadderParams, LadderState};
use crate::models::{AccountSnapshot, PositionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSignal {
    /// Flatten the direction-matching side and end the run.
    Close,
    /// Add one rung; `target_volume` is the signed position requested.
    Enter { target_volume: i64 },
    NoAction,
}

pub fn evaluate(
    params:          &LadderParams,
    ladder:          &LadderState,
    price:           Decimal,
    account:         &AccountSnapshot,
    position:        &PositionSnapshot,
    entry_in_flight: bool,
) -> TradeSignal {
    if account.floating_profit >= params.target_profit {
        return TradeSignal::Close;
    }

    if entry_in_flight {
        debug!(%price, "Entry still in flight — ladder paused");
        return TradeSignal::NoAction;
    }

    if !ladder.is_crossed(params.direction, price) {
        return TradeSignal::NoAction;
    }

    if !can_open(account, params.max_position_ratio) {
        debug!(
            %price,
            target_price = %ladder.target_price(),
            "Rung crossed but admission refused"
        );
        return TradeSignal::NoAction;
    }

    let current = params.direction.signed_volume(position);
    match ladder.next_volume(params.direction, current) {
        Some(target_volume) => TradeSignal::Enter { target_volume },
        None => {
            warn!(
                current,
                volume_step = ladder.volume_step(),
                "Next position size out of range — entry skipped"
            );
            TradeSignal::NoAction
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
