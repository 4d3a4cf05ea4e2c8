//! # ladderbot
//!
//! Position ladder controller for futures: scale into a position on adverse
//! moves along a price ladder, close everything at a floating-profit target.
//!
//! ```text
//!  ┌──────────────┐  UpdateEvent   ┌────────────────────┐  TradeEvent  ┌──────────┐
//!  │   Gateway    │ ──────────────▶│  LadderController  │ ────────────▶│ Notifier │
//!  │ bridge / sim │ ◀──────────────│  signal · ladder   │              └──────────┘
//!  └──────────────┘  OrderIntent   └────────────────────┘
//!                    target volume
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod notify;
