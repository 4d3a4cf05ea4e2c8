//! Domain models shared across the ladder controller, gateways and notifiers.

pub mod account;
pub mod direction;
pub mod kline;
pub mod order;

pub use account::{AccountSnapshot, PositionSnapshot};
pub use direction::{Direction, DirectionRules};
pub use kline::Kline;
pub use order::{Offset, OrderHandle, OrderIntent, OrderSide, OrderStatus, OrderUpdate};
