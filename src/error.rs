//! # error
//!
//! Centralised error taxonomy.
//!
//! Only [`ConfigError`] and [`GatewayError`] are allowed to end the process.
//! [`NotificationError`] and [`AdmissionError`] are absorbed where they occur
//! and only ever show up in the log.

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Malformed or missing settings. Raised before any trading begins.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

/// Connectivity loss or order rejection. Never retried by the controller.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    #[error("gateway HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("gateway rejected request: {0}")]
    Rejected(String),

    #[error("gateway response decode error: {0}")]
    Decode(String),

    #[error("gateway update stream closed")]
    StreamClosed,

    #[error("order {0} is unknown to the gateway")]
    UnknownOrder(String),

    #[error("no confirmation for {what} after {waited:?}")]
    ConfirmationTimeout { what: String, waited: Duration },
}

// ─── Notification ─────────────────────────────────────────────────────────────

/// Push delivery failure. Logged by the notifier, never surfaced.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification transport error: {0}")]
    Transport(String),

    #[error("notification endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

// ─── Admission ────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum AdmissionError {
    /// `1 - available / balance` has no meaning without positive equity.
    #[error("position ratio undefined for balance {balance}")]
    UndefinedRatio { balance: Decimal },
}

// ─── Top level ────────────────────────────────────────────────────────────────

/// Everything that may terminate a run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
