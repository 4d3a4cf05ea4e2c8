//! # ladderbot — position ladder controller
//!
//! ## Run
//!
//! ```text
//!  .env / environment ──▶ Config ──▶ BridgeGateway::connect ──▶ LadderController::run
//!                                                                      │
//!                              push endpoint or log ◀── TradeEvent ◀───┘
//! ```
//!
//! The process exits once the floating-profit target has closed the position
//! (exit code 0) or on the first configuration or gateway error (non-zero).
//! See `config.rs` for the full list of environment variables.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use ladderbot::config::Config;
use ladderbot::engine::{LadderController, RunOutcome};
use ladderbot::error::AppError;
use ladderbot::gateway::{BridgeGateway, Gateway};
use ladderbot::logging;
use ladderbot::notify::{LogNotifier, Notifier, PushNotifier};

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional — CI/prod can use real env vars) ──────────────
    dotenvy::dotenv().ok();

    // ── 2. Settings, then logging into the configured directory ─────────────
    let config = load_config().context("loading configuration")?;
    let log_file = logging::init(&config.log_dir)?;

    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║        LADDERBOT — Position Ladder            ║
  ║        scale in on retracement · exit on P&L  ║
  ╚═══════════════════════════════════════════════╝"#
    );
    info!(log_file = %log_file.display(), session = ?config.session, "Configuration loaded");

    // ── 3. Run one ladder to completion ──────────────────────────────────────
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);

    match run(&config).instrument(span).await {
        Ok(outcome) => {
            info!(
                %run_id,
                entries         = outcome.entries,
                closed_volume   = outcome.closed_volume,
                still_open      = outcome.remaining_volume,
                final_target    = %outcome.final_target_price,
                floating_profit = %outcome.floating_profit,
                "🏁 Run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(%run_id, error = %e, "❌ Run aborted");
            Err(e).context("ladder run failed")
        }
    }
}

fn load_config() -> Result<Config, AppError> {
    Ok(Config::from_env()?)
}

async fn run(config: &Config) -> Result<RunOutcome, AppError> {
    let client = reqwest::Client::new();

    let gateway = BridgeGateway::connect(client.clone(), &config.gateway_url, &config.session).await?;

    let push = config.push.clone().map(|push| {
        info!(url = %push.url, "Push notifications enabled");
        Arc::new(PushNotifier::new(client, push))
    });
    let notifier: Arc<dyn Notifier> = match &push {
        Some(push) => push.clone() as Arc<dyn Notifier>,
        None => {
            info!("NOTIFY_URL not set — trade events go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let mut controller =
        LadderController::new(config.params.clone(), config.ladder, gateway, notifier);
    let result = controller.run().await;

    let mut gateway = controller.into_gateway();
    if let Err(e) = gateway.shutdown().await {
        warn!(error = %e, "Bridge session not closed cleanly");
    }
    if let Some(push) = push {
        push.drain().await;
    }

    Ok(result?)
}
