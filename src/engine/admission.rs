//! # engine::admission
//!
//! Capital gate in front of every entry.
//!
//! The account may add to the position while the fraction of equity already
//! committed, `1 - available / balance`, stays at or below the configured
//! maximum.  A snapshot without positive equity has no ratio; that is logged
//! and treated as "not admissible" so a bad snapshot never halts the run.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::AdmissionError;
use crate::models::AccountSnapshot;

/// Fraction of equity currently committed.
pub fn used_ratio(account: &AccountSnapshot) -> Result<Decimal, AdmissionError> {
    if account.balance <= Decimal::ZERO {
        return Err(AdmissionError::UndefinedRatio { balance: account.balance });
    }
    let free = account
        .available
        .checked_div(account.balance)
        .ok_or(AdmissionError::UndefinedRatio { balance: account.balance })?;
    Ok(Decimal::ONE - free)
}

/// `true` if the account may add to the position.
pub fn can_open(account: &AccountSnapshot, max_position_ratio: Decimal) -> bool {
    match used_ratio(account) {
        Ok(ratio) => {
            let admissible = ratio <= max_position_ratio;
            debug!(
                used_ratio = %ratio,
                max_ratio  = %max_position_ratio,
                admissible,
                "Admission evaluated"
            );
            admissible
        }
        Err(e) => {
            warn!(
                error     = %e,
                balance   = %account.balance,
                available = %account.available,
                "Admission refused: account snapshot has no usable balance"
            );
            false
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
