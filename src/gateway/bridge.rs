//! # gateway::bridge
//!
//! [`Gateway`] over HTTP to a broker bridge service.
//!
//! ## Bridge API Contract
//! ```text
//! POST   {base}/api/session                      login + subscribe  → SessionResponse
//! GET    {base}/api/session/{id}/updates/next    long-poll          → UpdateEvent | 204
//! POST   {base}/api/session/{id}/orders          OrderRequest       → OrderAck
//! POST   {base}/api/session/{id}/target-volume   TargetRequest      → 2xx
//! DELETE {base}/api/session/{id}                 logout
//! ```
//! The bridge holds a long-poll open for at most 60 s.  A 204 means "nothing
//! yet"; the adapter polls again, pausing briefly when the 204 came back
//! without the bridge holding the request.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::GatewayError;
use crate::gateway::{Gateway, GatewayCache, UpdateEvent};
use crate::models::{
    AccountSnapshot, OrderHandle, OrderIntent, OrderStatus, OrderUpdate, PositionSnapshot,
};

/// Upper bound for plain request/response calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-side limit for one long-poll: the bridge's 60 s hold plus margin.
const POLL_TIMEOUT: Duration = Duration::from_secs(65);

/// A 204 answered faster than this was not held by the bridge.
const HELD_POLL_MIN: Duration = Duration::from_secs(1);

/// Pause after an unheld 204 before polling again.
const EMPTY_POLL_BACKOFF: Duration = Duration::from_millis(250);

// ─── Wire Types ───────────────────────────────────────────────────────────────

/// Login and subscription parameters.
#[derive(Clone, Serialize)]
pub struct SessionRequest {
    pub broker_id:    String,
    pub account_id:   String,
    pub password:     String,
    pub sdk_user:     String,
    pub sdk_password: String,
    pub instrument:   String,
    pub kline_secs:   u64,
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("broker_id", &self.broker_id)
            .field("account_id", &self.account_id)
            .field("password", &"***")
            .field("sdk_user", &self.sdk_user)
            .field("sdk_password", &"***")
            .field("instrument", &self.instrument)
            .field("kline_secs", &self.kline_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
    account:    AccountSnapshot,
    #[serde(default)]
    position:   PositionSnapshot,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    instrument: &'a str,
    #[serde(flatten)]
    intent:     &'a OrderIntent,
}

#[derive(Debug, Deserialize)]
struct OrderAck {
    accepted: bool,
    order_id: Option<String>,
    message:  Option<String>,
}

#[derive(Debug, Serialize)]
struct TargetRequest<'a> {
    instrument: &'a str,
    volume:     i64,
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

pub struct BridgeGateway {
    client:     reqwest::Client,
    base_url:   String,
    session_id: String,
    cache:      GatewayCache,
}

impl BridgeGateway {
    /// Log in, subscribe to the instrument's klines and seed the snapshots.
    pub async fn connect(
        client: reqwest::Client,
        base_url: &str,
        request: &SessionRequest,
    ) -> Result<Self, GatewayError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let url = format!("{base_url}/api/session");

        info!(
            url        = %url,
            broker_id  = %request.broker_id,
            account_id = %request.account_id,
            instrument = %request.instrument,
            kline_secs = request.kline_secs,
            "Opening bridge session"
        );

        let response = client
            .post(&url)
            .json(request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport_error)?;
        let session: SessionResponse = decode(check_status(response).await?).await?;

        info!(
            session_id = %session.session_id,
            balance    = %session.account.balance,
            available  = %session.account.available,
            "✅ Bridge session established"
        );

        let mut cache = GatewayCache::new(session.account);
        cache.set_position(&request.instrument, session.position);

        Ok(Self { client, base_url, session_id: session.session_id, cache })
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/api/session/{}{}", self.base_url, self.session_id, path)
    }
}

#[async_trait]
impl Gateway for BridgeGateway {
    async fn next_update(&mut self) -> Result<UpdateEvent, GatewayError> {
        let url = self.session_url("/updates/next");
        loop {
            let started = Instant::now();
            let response = self
                .client
                .get(&url)
                .timeout(POLL_TIMEOUT)
                .send()
                .await
                .map_err(transport_error)?;

            if response.status() == reqwest::StatusCode::NO_CONTENT {
                debug!("Bridge long-poll returned no update — polling again");
                if let Some(pause) = empty_poll_backoff(started.elapsed()) {
                    tokio::time::sleep(pause).await;
                }
                continue;
            }

            let update: UpdateEvent = decode(check_status(response).await?).await?;
            self.cache.apply(&update);
            return Ok(update);
        }
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
        let url = self.session_url("/orders");

        info!(
            instrument,
            side   = ?intent.side,
            offset = ?intent.offset,
            volume = intent.volume,
            price  = %intent.limit_price,
            "🚀 Sending order to bridge"
        );

        let response = self
            .client
            .post(&url)
            .json(&OrderRequest { instrument, intent })
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport_error)?;
        let ack: OrderAck = decode(check_status(response).await?).await?;
        let order_id = accepted_order_id(ack)?;

        // Alive until the stream says otherwise.
        self.cache.apply(&UpdateEvent::Order {
            order: OrderUpdate {
                order_id:      order_id.clone(),
                status:        OrderStatus::Alive,
                volume_origin: intent.volume,
                volume_left:   intent.volume,
            },
        });

        info!(order_id = %order_id, "✅ Bridge accepted order");
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
        let url = self.session_url("/target-volume");

        info!(instrument, signed_volume, "🎯 Setting target volume on bridge");

        let response = self
            .client
            .post(&url)
            .json(&TargetRequest { instrument, volume: signed_volume })
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), GatewayError> {
        let url = self.session_url("");
        let response = self
            .client
            .delete(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        info!(session_id = %self.session_id, "Bridge session closed");
        Ok(())
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn empty_poll_backoff(held_for: Duration) -> Option<Duration> {
    (held_for < HELD_POLL_MIN).then_some(EMPTY_POLL_BACKOFF)
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    error!(error = %e, "Bridge unreachable");
    GatewayError::Unreachable(e.to_string())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(http_status = %status, body = %body, "Bridge returned HTTP error");
    Err(GatewayError::Http { status: status.as_u16(), body })
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    response.json().await.map_err(|e| {
        error!(error = %e, "Bridge response parse failed");
        GatewayError::Decode(e.to_string())
    })
}

fn accepted_order_id(ack: OrderAck) -> Result<String, GatewayError> {
    let reason = ack.message.unwrap_or_else(|| "unknown".to_string());
    match (ack.accepted, ack.order_id) {
        (true, Some(id)) => Ok(id),
        (true, None) => Err(GatewayError::Decode(format!("accepted order without id: {reason}"))),
        (false, _) => {
            warn!(reason = %reason, "Bridge rejected order");
            Err(GatewayError::Rejected(reason))
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Offset, OrderSide};
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_request_is_flat() {
        let intent = OrderIntent {
            side: OrderSide::Sell,
            offset: Offset::Close,
            volume: 3,
            limit_price: dec!(3012.5),
        };
        let json = serde_json::to_value(OrderRequest { instrument: "X", intent: &intent }).unwrap();
        assert_eq!(json["instrument"], "X");
        assert_eq!(json["side"], "SELL");
        assert_eq!(json["offset"], "CLOSE");
        assert_eq!(json["volume"], 3);
        assert_eq!(json["limit_price"], "3012.5");
    }

    #[test]
    fn test_rejected_ack_is_error() {
        let ack = OrderAck { accepted: false, order_id: None, message: Some("no margin".into()) };
        assert!(matches!(accepted_order_id(ack), Err(GatewayError::Rejected(m)) if m == "no margin"));

        let ack = OrderAck { accepted: true, order_id: Some("A7".into()), message: None };
        assert_eq!(accepted_order_id(ack).unwrap(), "A7");
    }

    #[test]
    fn test_only_unheld_empty_polls_back_off() {
        assert_eq!(empty_poll_backoff(Duration::from_millis(3)), Some(EMPTY_POLL_BACKOFF));
        assert_eq!(empty_poll_backoff(Duration::from_secs(60)), None);
        assert!(POLL_TIMEOUT > Duration::from_secs(60));
    }

    #[test]
    fn test_credentials_are_redacted() {
        let request = SessionRequest {
            broker_id:    "simnow".into(),
            account_id:   "0001".into(),
            password:     "hunter2".into(),
            sdk_user:     "me".into(),
            sdk_password: "s3cret".into(),
            instrument:   "X".into(),
            kline_secs:   86400,
        };
        let shown = format!("{request:?}");
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn test_session_response_defaults_position() {
        let json = r#"{ "session_id": "s1", "account": { "balance": "1000", "available": "900", "floating_profit": "0" } }"#;
        let session: SessionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(session.position, PositionSnapshot::default());
        assert_eq!(session.account.available, dec!(900));
    }
}
