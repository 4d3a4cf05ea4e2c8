//! # gateway
//!
//! The market/broker boundary.  A [`Gateway`] yields a stream of
//! [`UpdateEvent`]s and accepts orders and target-volume requests.
//!
//! Every adapter folds each update into a [`GatewayCache`] before handing it
//! out, so `current_account` / `current_position` / `order_status` always
//! reflect everything received so far.  The controller is the only reader.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::models::{
    AccountSnapshot, Kline, OrderHandle, OrderIntent, OrderUpdate, PositionSnapshot,
};

pub mod bridge;
pub mod sim;

pub use bridge::{BridgeGateway, SessionRequest};
pub use sim::{FillMode, SimFeed, SimGateway};

// ─── Update Stream ────────────────────────────────────────────────────────────

/// One state change pushed by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    Kline { instrument: String, kline: Kline },
    Account { account: AccountSnapshot },
    Position { instrument: String, position: PositionSnapshot },
    Order { order: OrderUpdate },
}

impl UpdateEvent {
    /// The kline carried by this update, if it belongs to `instrument`.
    pub fn kline_for(&self, instrument: &str) -> Option<&Kline> {
        match self {
            UpdateEvent::Kline { instrument: i, kline } if i == instrument => Some(kline),
            _ => None,
        }
    }
}

// ─── Gateway Contract ─────────────────────────────────────────────────────────

#[async_trait]
pub trait Gateway: Send {
    /// Suspend until the next update.  The update is already reflected in the
    /// cached snapshots when this returns.
    async fn next_update(&mut self) -> Result<UpdateEvent, GatewayError>;

    fn current_account(&self) -> AccountSnapshot;

    fn current_position(&self, instrument: &str) -> PositionSnapshot;

    /// Place a limit order.  Its status arrives through later updates.
    async fn submit_order(
        &mut self,
        instrument: &str,
        intent: &OrderIntent,
    ) -> Result<OrderHandle, GatewayError>;

    /// Latest status received for `handle`, if any.
    fn order_status(&self, handle: &OrderHandle) -> Option<OrderUpdate>;

    /// Ask the gateway to work the position towards `signed_volume` lots
    /// (positive long, negative short).
    async fn set_target_volume(
        &mut self,
        instrument: &str,
        signed_volume: i64,
    ) -> Result<(), GatewayError>;

    /// Release the session.  Adapters without a session do nothing.
    async fn shutdown(&mut self) -> Result<(), GatewayError> {
        Ok(())
    }
}

// ─── Cache ────────────────────────────────────────────────────────────────────

/// Latest known snapshots, shared by all adapters.
#[derive(Debug, Default, Clone)]
pub struct GatewayCache {
    account:   AccountSnapshot,
    positions: HashMap<String, PositionSnapshot>,
    orders:    HashMap<String, OrderUpdate>,
}

impl GatewayCache {
    pub fn new(account: AccountSnapshot) -> Self {
        Self { account, ..Self::default() }
    }

    pub fn apply(&mut self, update: &UpdateEvent) {
        match update {
            UpdateEvent::Kline { .. } => {}
            UpdateEvent::Account { account } => self.account = *account,
            UpdateEvent::Position { instrument, position } => {
                self.positions.insert(instrument.clone(), *position);
            }
            UpdateEvent::Order { order } => {
                self.orders.insert(order.order_id.clone(), order.clone());
            }
        }
    }

    pub fn account(&self) -> AccountSnapshot {
        self.account
    }

    pub fn position(&self, instrument: &str) -> PositionSnapshot {
        self.positions.get(instrument).copied().unwrap_or_default()
    }

    pub fn order(&self, id: &str) -> Option<OrderUpdate> {
        self.orders.get(id).cloned()
    }

    pub fn set_position(&mut self, instrument: &str, position: PositionSnapshot) {
        self.positions.insert(instrument.to_string(), position);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
