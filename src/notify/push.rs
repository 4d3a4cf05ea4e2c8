//! # notify::push
//!
//! JSON push notifications over HTTP.
//!
//! ## Payload
//! ```json
//! { "title": "Open order placed", "body": "...", "device_key": "...",
//!   "category": "quant", "group": "future", "sound": "...", "badge": 1,
//!   "icon": "...", "url": "..." }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::NotificationError;
use crate::events::TradeEvent;
use crate::notify::Notifier;

const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct PushConfig {
    pub url:        String,
    pub device_key: String,
    pub sound:      String,
    pub icon:       String,
    /// Link opened when the notification is tapped.
    pub msg_url:    String,
    pub category:   String,
    pub group:      String,
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    title:      &'a str,
    body:       &'a str,
    device_key: &'a str,
    category:   &'a str,
    group:      &'a str,
    sound:      &'a str,
    badge:      u32,
    icon:       &'a str,
    url:        &'a str,
}

#[derive(Debug, Clone)]
pub struct PushNotifier {
    client:    reqwest::Client,
    config:    Arc<PushConfig>,
    /// Deliveries started by `notify` and not yet drained.
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl PushNotifier {
    pub fn new(client: reqwest::Client, config: PushConfig) -> Self {
        Self { client, config: Arc::new(config), in_flight: Arc::default() }
    }

    /// Wait for every delivery started so far.  Called before the process
    /// exits so the final event is not dropped with the runtime.
    pub async fn drain(&self) {
        let pending = match self.in_flight.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => return,
        };
        for task in pending {
            let _ = task.await;
        }
    }

    /// Deliver one event and wait for the endpoint's answer.
    pub async fn deliver(&self, event: &TradeEvent) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&payload(&self.config, event))
            .timeout(PUSH_TIMEOUT)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Status { status: status.as_u16(), body });
        }

        debug!(http_status = %status, action = %event.action, "Push delivered");
        Ok(())
    }
}

impl Notifier for PushNotifier {
    fn notify(&self, event: &TradeEvent) {
        let notifier = self.clone();
        let event = event.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = notifier.deliver(&event).await {
                warn!(error = %e, action = %event.action, "Push notification failed");
            }
        });

        if let Ok(mut tasks) = self.in_flight.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(task);
        }
    }
}

fn payload<'a>(config: &'a PushConfig, event: &'a TradeEvent) -> PushPayload<'a> {
    PushPayload {
        title:      event.action.title(),
        body:       &event.message,
        device_key: &config.device_key,
        category:   &config.category,
        group:      &config.group,
        sound:      &config.sound,
        badge:      1,
        icon:       &config.icon,
        url:        &config.msg_url,
    }
}
