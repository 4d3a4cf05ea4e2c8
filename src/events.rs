//! # events
//!
//! Defines [`TradeEvent`] — the human-readable record of every order intent,
//! fill confirmation and close.  Each event goes to the log sink and to the
//! notifier; nothing waits for an acknowledgement.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradeAction {
    /// An entry order (or entry target) was submitted.
    OpenRequest,
    /// An entry order reached terminal status (or the entry target was reached).
    OpenSuccess,
    /// The close-all order (or zero target) was submitted.
    CloseRequest,
    /// The position is flat and the run is over.
    CloseSuccess,
}

impl TradeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeAction::OpenRequest  => "open-request",
            TradeAction::OpenSuccess  => "open-success",
            TradeAction::CloseRequest => "close-request",
            TradeAction::CloseSuccess => "close-success",
        }
    }

    /// Short title for push notifications.
    pub fn title(self) -> &'static str {
        match self {
            TradeAction::OpenRequest  => "Open order placed",
            TradeAction::OpenSuccess  => "Open order filled",
            TradeAction::CloseRequest => "Close order placed",
            TradeAction::CloseSuccess => "Position closed",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeEvent {
    pub action: TradeAction,
    pub message: String,
    pub instrument: String,
    pub at: DateTime<Utc>,
}

impl TradeEvent {
    pub fn new(action: TradeAction, instrument: &str, message: impl Into<String>) -> Self {
        Self {
            action,
            message: message.into(),
            instrument: instrument.to_string(),
            at: Utc::now(),
        }
    }

    /// One-line JSON record for the log sink.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_kebab_case() {
        let event = TradeEvent::new(TradeAction::CloseSuccess, "SHFE.rb2405", "flat");
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["action"], "close-success");
        assert_eq!(json["instrument"], "SHFE.rb2405");
        assert_eq!(TradeAction::OpenRequest.to_string(), "open-request");
    }
}
