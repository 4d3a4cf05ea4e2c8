//! # config — run settings from environment variables
//!
//! Read once at start-up and never changed afterwards.  Parsing goes through
//! a lookup function so tests can hand in a map instead of the process
//! environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::engine::{LadderParams, LadderState, VolumeProgression};
use crate::error::ConfigError;
use crate::gateway::SessionRequest;
use crate::models::Direction;
use crate::notify::PushConfig;

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the broker bridge.
    pub gateway_url: String,
    pub session:     SessionRequest,
    pub params:      LadderParams,
    /// Starting rung; `volume_step` and `price_step` ride along.
    pub ladder:      LadderState,
    /// `None` → log-only notifications.
    pub push:        Option<PushConfig>,
    pub log_dir:     PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let instrument = env.required("LADDER_INSTRUMENT")?;
        let direction: Direction = env.parsed_or("LADDER_DIRECTION", Direction::Long)?;

        let max_position_ratio: Decimal = env.parsed("LADDER_MAX_POSITION_RATIO")?;
        if max_position_ratio < Decimal::ZERO || max_position_ratio > Decimal::ONE {
            return Err(ConfigError::Invalid {
                key:    "LADDER_MAX_POSITION_RATIO",
                reason: format!("must be within [0, 1], got {max_position_ratio}"),
            });
        }

        let confirm_timeout = match env.optional("LADDER_CONFIRM_TIMEOUT_SECS") {
            None => None,
            Some(_) => {
                let secs: u64 = env.parsed("LADDER_CONFIRM_TIMEOUT_SECS")?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key:    "LADDER_CONFIRM_TIMEOUT_SECS",
                        reason: "must be > 0 when set".into(),
                    });
                }
                Some(Duration::from_secs(secs))
            }
        };

        let params = LadderParams {
            instrument: instrument.clone(),
            direction,
            target_profit: env.parsed("LADDER_TARGET_PROFIT")?,
            max_position_ratio,
            progression: env.parsed_or("LADDER_VOLUME_MODE", VolumeProgression::FixedIncrement)?,
            confirm_timeout,
        };

        let ladder = LadderState::new(
            env.parsed("LADDER_INIT_PRICE")?,
            env.parsed("LADDER_PRICE_STEP")?,
            env.parsed_or("LADDER_VOLUME_STEP", 1u64)?,
        )?;

        let session = SessionRequest {
            broker_id:    env.required("BROKER_ID")?,
            account_id:   env.required("BROKER_ACCOUNT")?,
            password:     env.required("BROKER_PASSWORD")?,
            sdk_user:     env.required("SDK_USER")?,
            sdk_password: env.required("SDK_PASSWORD")?,
            instrument,
            kline_secs:   env.parsed_or("LADDER_KLINE_SECS", 86_400u64)?,
        };

        let push = env.optional("NOTIFY_URL").map(|url| PushConfig {
            url,
            device_key: env.or("NOTIFY_DEVICE_KEY", ""),
            sound:      env.or("NOTIFY_SOUND", ""),
            icon:       env.or("NOTIFY_ICON", ""),
            msg_url:    env.or("NOTIFY_MSG_URL", ""),
            category:   env.or("NOTIFY_CATEGORY", "quant"),
            group:      env.or("NOTIFY_GROUP", "future"),
        });

        Ok(Self {
            gateway_url: env.required("GATEWAY_URL")?,
            session,
            params,
            ladder,
            push,
            log_dir: PathBuf::from(env.or("LOG_DIR", "log")),
        })
    }
}

// ─── Lookup Helpers ───────────────────────────────────────────────────────────

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Set and not blank.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parsed<T>(&self, key: &'static str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(key)?;
        raw.parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
    }

    fn parsed_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(_) => self.parsed(key),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
