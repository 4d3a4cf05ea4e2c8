//! # notify
//!
//! Best-effort delivery of [`TradeEvent`]s to a human.
//!
//! `notify` must never block the trading loop and never fail it: adapters
//! hand delivery off to a background task and log what goes wrong.

use tracing::{info, warn};

use crate::events::TradeEvent;

pub mod push;

pub use push::{PushConfig, PushNotifier};

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &TradeEvent);
}

/// Used when no push endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &TradeEvent) {
        match event.to_json() {
            Ok(record) => info!(action = %event.action, record = %record, "📣 [NOTIFY] {}", event.message),
            Err(e) => warn!(action = %event.action, error = %e, "📣 [NOTIFY] {}", event.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TradeAction;

    #[test]
    fn test_log_notifier_record_is_the_event_json() {
        let event = TradeEvent::new(TradeAction::OpenRequest, "SHFE.rb2405", "BUY 1 @ 2995");
        let record: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(record["action"], "open-request");
        assert_eq!(record["message"], "BUY 1 @ 2995");

        // Never panics, never blocks.
        LogNotifier.notify(&event);
    }
}
