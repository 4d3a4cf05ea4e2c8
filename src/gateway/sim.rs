//! # gateway::sim
//!
//! In-memory [`Gateway`] driven by a tokio channel.
//!
//! A [`SimFeed`] pushes updates; the [`SimGateway`] hands them to the
//! controller in order.  With [`FillMode::Immediate`] every order and every
//! target request is filled on the spot: the fill and the resulting position
//! are queued ahead of the next feed update.  With [`FillMode::Manual`] the
//! feed is responsible for reporting order status.
//!
//! Every submitted intent and target request is journaled for inspection.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::{Gateway, GatewayCache, UpdateEvent};
use crate::models::{
    AccountSnapshot, Kline, Offset, OrderHandle, OrderIntent, OrderSide, OrderStatus,
    OrderUpdate, PositionSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Immediate,
    Manual,
}

// ─── Feed ─────────────────────────────────────────────────────────────────────

/// Producer side of the simulated update stream.  Dropping every feed closes
/// the stream.
#[derive(Debug, Clone)]
pub struct SimFeed {
    tx: mpsc::UnboundedSender<UpdateEvent>,
}

impl SimFeed {
    /// Returns `false` once the gateway is gone.
    pub fn push(&self, update: UpdateEvent) -> bool {
        self.tx.send(update).is_ok()
    }

    pub fn kline(&self, instrument: &str, kline: Kline) -> bool {
        self.push(UpdateEvent::Kline { instrument: instrument.to_string(), kline })
    }

    pub fn account(&self, account: AccountSnapshot) -> bool {
        self.push(UpdateEvent::Account { account })
    }

    pub fn position(&self, instrument: &str, position: PositionSnapshot) -> bool {
        self.push(UpdateEvent::Position { instrument: instrument.to_string(), position })
    }

    pub fn order(&self, order: OrderUpdate) -> bool {
        self.push(UpdateEvent::Order { order })
    }
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SimGateway {
    rx:        mpsc::UnboundedReceiver<UpdateEvent>,
    queued:    VecDeque<UpdateEvent>,
    cache:     GatewayCache,
    fill_mode: FillMode,
    next_id:   u64,
    submitted: Vec<(String, OrderIntent)>,
    targets:   Vec<(String, i64)>,
    /// Reason the next submitted order is refused with.
    reject:    Option<String>,
}

impl SimGateway {
    pub fn new(fill_mode: FillMode) -> (SimFeed, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway = Self {
            rx,
            queued: VecDeque::new(),
            cache: GatewayCache::default(),
            fill_mode,
            next_id: 0,
            submitted: Vec::new(),
            targets: Vec::new(),
            reject: None,
        };
        (SimFeed { tx }, gateway)
    }

    /// Seed the snapshots the gateway reports before any update arrives.
    pub fn with_snapshot(
        mut self,
        account: AccountSnapshot,
        instrument: &str,
        position: PositionSnapshot,
    ) -> Self {
        self.cache = GatewayCache::new(account);
        self.cache.set_position(instrument, position);
        self
    }

    /// Refuse the next order with `reason`, as a broker would.
    pub fn reject_next_order(&mut self, reason: &str) {
        self.reject = Some(reason.to_string());
    }

    /// Every accepted order so far, in submission order.
    pub fn submitted(&self) -> &[(String, OrderIntent)] {
        &self.submitted
    }

    /// Every target-volume request so far.
    pub fn targets(&self) -> &[(String, i64)] {
        &self.targets
    }

    fn fill(&mut self, instrument: &str, intent: &OrderIntent) -> PositionSnapshot {
        let mut position = self.cache.position(instrument);
        let v = intent.volume;
        match (intent.offset, intent.side) {
            (Offset::Open, OrderSide::Buy)   => position.volume_long += v,
            (Offset::Open, OrderSide::Sell)  => position.volume_short += v,
            (Offset::Close, OrderSide::Sell) => {
                position.volume_long = position.volume_long.saturating_sub(v)
            }
            (Offset::Close, OrderSide::Buy)  => {
                position.volume_short = position.volume_short.saturating_sub(v)
            }
        }
        position
    }
}

#[async_trait]
impl Gateway for SimGateway {
    async fn next_update(&mut self) -> Result<UpdateEvent, GatewayError> {
        let update = match self.queued.pop_front() {
            Some(update) => update,
            None => self.rx.recv().await.ok_or(GatewayError::StreamClosed)?,
        };
        self.cache.apply(&update);
        Ok(update)
    }

    fn current_account(&self) -> AccountSnapshot {
        self.cache.account()
    }

    fn current_position(&self, instrument: &str) -> PositionSnapshot {
        self.cache.position(instrument)
    }

    async fn submit_order(
        &mut self,
        instrument: &str,
        intent: &OrderIntent,
    ) -> Result<OrderHandle, GatewayError> {
        if let Some(reason) = self.reject.take() {
            debug!(instrument, ?intent, reason = %reason, "[SIM] order rejected");
            return Err(GatewayError::Rejected(reason));
        }

        self.next_id += 1;
        let order_id = format!("sim-{}", self.next_id);
        self.submitted.push((instrument.to_string(), *intent));
        debug!(order_id, ?intent, "[SIM] order accepted");

        let alive = OrderUpdate {
            order_id:      order_id.clone(),
            status:        OrderStatus::Alive,
            volume_origin: intent.volume,
            volume_left:   intent.volume,
        };
        self.cache.apply(&UpdateEvent::Order { order: alive });

        if self.fill_mode == FillMode::Immediate {
            let position = self.fill(instrument, intent);
            self.queued.push_back(UpdateEvent::Order {
                order: OrderUpdate {
                    order_id:      order_id.clone(),
                    status:        OrderStatus::Finished,
                    volume_origin: intent.volume,
                    volume_left:   0,
                },
            });
            self.queued.push_back(UpdateEvent::Position {
                instrument: instrument.to_string(),
                position,
            });
        }

        Ok(OrderHandle(order_id))
    }

    fn order_status(&self, handle: &OrderHandle) -> Option<OrderUpdate> {
        self.cache.order(&handle.0)
    }

    async fn set_target_volume(
        &mut self,
        instrument: &str,
        signed_volume: i64,
    ) -> Result<(), GatewayError> {
        self.targets.push((instrument.to_string(), signed_volume));
        debug!(instrument, signed_volume, "[SIM] target volume set");

        if self.fill_mode == FillMode::Immediate {
            self.queued.push_back(UpdateEvent::Position {
                instrument: instrument.to_string(),
                position:   PositionSnapshot::from_signed(signed_volume),
            });
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
