//! # models::order
//!
//! Order intents the controller hands to the gateway, and the status
//! updates the gateway reports back for them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Side / Offset ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Whether an order opens new exposure or closes existing exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Offset {
    Open,
    Close,
}

// ─── OrderIntent ──────────────────────────────────────────────────────────────

/// A limit order the controller wants placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: OrderSide,
    pub offset: Offset,
    pub volume: u64,
    pub limit_price: Decimal,
}

// ─── Handle / Status ──────────────────────────────────────────────────────────

/// Gateway-assigned identity of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderHandle(pub String);

impl std::fmt::Display for OrderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Working at the exchange.
    Alive,
    /// Terminal: fully filled, cancelled or expired.
    Finished,
}

/// Latest known state of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: String,
    pub status: OrderStatus,
    pub volume_origin: u64,
    pub volume_left: u64,
}

impl OrderUpdate {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status == OrderStatus::Finished
    }

    #[inline]
    pub fn filled(&self) -> u64 {
        self.volume_origin.saturating_sub(self.volume_left)
    }
}
