//! # engine::executor
//!
//! Builds order intents and waits for the gateway to confirm them.
//!
//! A confirmation wait is a nested receive on the same update stream the
//! controller reads klines from.  Unrelated updates are absorbed (the gateway
//! has already cached them) until the awaited order turns terminal, or the
//! instrument's position reaches the requested size.

use std::future::Future;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::GatewayError;
use crate::gateway::{Gateway, UpdateEvent};
use crate::models::{Direction, Offset, OrderHandle, OrderIntent, OrderUpdate};

// ─── Build Orders ─────────────────────────────────────────────────────────────

/// Limit order adding `volume` lots on `direction`'s side.
pub fn build_entry(direction: Direction, volume: u64, price: Decimal) -> OrderIntent {
    OrderIntent {
        side:        direction.rules().open_side,
        offset:      Offset::Open,
        volume,
        limit_price: price,
    }
}

/// Limit order closing `volume` lots held on `direction`'s side.
pub fn build_close(direction: Direction, volume: u64, price: Decimal) -> OrderIntent {
    OrderIntent {
        side:        direction.rules().close_side,
        offset:      Offset::Close,
        volume,
        limit_price: price,
    }
}

// ─── Confirmation Waits ───────────────────────────────────────────────────────

/// Wait until `handle` reports terminal status.
pub async fn await_order<G: Gateway + ?Sized>(
    gateway: &mut G,
    handle:  &OrderHandle,
    limit:   Option<Duration>,
) -> Result<OrderUpdate, GatewayError> {
    within(limit, format!("order {handle}"), wait_terminal(gateway, handle)).await
}

/// Wait until the signed position on `direction`'s side equals `target`.
pub async fn await_position<G: Gateway + ?Sized>(
    gateway:    &mut G,
    instrument: &str,
    direction:  Direction,
    target:     i64,
    limit:      Option<Duration>,
) -> Result<(), GatewayError> {
    within(
        limit,
        format!("{instrument} position {target}"),
        wait_position(gateway, instrument, direction, target),
    )
    .await
}

async fn wait_terminal<G: Gateway + ?Sized>(
    gateway: &mut G,
    handle:  &OrderHandle,
) -> Result<OrderUpdate, GatewayError> {
    loop {
        match gateway.order_status(handle) {
            Some(status) if status.is_terminal() => return Ok(status),
            Some(_) => {}
            None => return Err(GatewayError::UnknownOrder(handle.0.clone())),
        }

        match gateway.next_update().await? {
            UpdateEvent::Order { order } if order.order_id == handle.0 => {
                debug!(
                    order_id    = %order.order_id,
                    status      = ?order.status,
                    volume_left = order.volume_left,
                    "Order status update"
                );
            }
            other => trace!(update = ?other, "Absorbed while awaiting order"),
        }
    }
}

async fn wait_position<G: Gateway + ?Sized>(
    gateway:    &mut G,
    instrument: &str,
    direction:  Direction,
    target:     i64,
) -> Result<(), GatewayError> {
    loop {
        let current = direction.signed_volume(&gateway.current_position(instrument));
        if current == target {
            return Ok(());
        }
        trace!(current, target, "Position not yet at target");
        gateway.next_update().await?;
    }
}

async fn within<T, F>(limit: Option<Duration>, what: String, wait: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match limit {
        None => wait.await,
        Some(waited) => tokio::time::timeout(waited, wait)
            .await
            .map_err(|_| GatewayError::ConfirmationTimeout { what, waited })?,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
