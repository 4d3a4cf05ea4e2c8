//! # engine
//!
//! Decision and execution core.  `admission`, `ladder` and `signal` are pure;
//! `executor` and `controller` drive a [`crate::gateway::Gateway`].

pub mod admission;
pub mod controller;
pub mod executor;
pub mod ladder;
pub mod signal;

pub use admission::{can_open, used_ratio};
pub use controller::{LadderController, Phase, RunOutcome};
pub use ladder::{LadderParams, LadderState, VolumeProgression};
pub use signal::{evaluate, TradeSignal};
