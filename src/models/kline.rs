//! # models::kline
//!
//! Defines [`Kline`], the price bar the gateway pushes for the subscribed
//! instrument.  The controller only decides on kline updates; the bar's
//! close is the decision price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The latest bar of the subscribed kline serial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// Bar open time, when the bridge reports it.
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    pub high: Decimal,
    pub low: Decimal,
    /// Latest traded price inside the bar.
    pub close: Decimal,
}
