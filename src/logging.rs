//! # logging
//!
//! Console output plus one plain-text log file per run under `LOG_DIR`.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Local};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.  Returns the path of this run's log file.
pub fn init(log_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let path = log_dir.join(log_file_name(Local::now()));
    let file = File::create(&path)
        .with_context(|| format!("creating log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(EnvFilter::from_default_env()
            .add_directive("ladderbot=debug".parse()?)
            .add_directive("reqwest=warn".parse()?))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(path)
}

fn log_file_name(at: DateTime<Local>) -> String {
    format!("ladder_{}.log", at.format("%Y%m%d_%H%M%S"))
}
