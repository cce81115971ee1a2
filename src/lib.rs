use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub mod api;
pub mod config;
pub mod content;
pub mod dashboard;
pub mod effects;
pub mod error;
pub mod ffmpeg;
pub mod footage;
pub mod generator;
pub mod init;
pub mod narration;
mod process;
pub mod publisher;
pub mod queue;
pub mod retry;
pub mod scheduler;
pub mod server;
pub mod status;

pub const LOG_FILE: &str = "bot.log";

/// Console output plus an append-only `bot.log` in `logs_dir`. The level
/// comes from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing(logs_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create directory: {}", logs_dir.display()))?;
    let path = logs_dir.join(LOG_FILE);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("[{}] {}", tag, message),
        "ERROR" => tracing::error!("[{}] {}", tag, message),
        _ => tracing::info!("[{}] {}", tag, message),
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}

pub(crate) fn loge(message: impl AsRef<str>) {
    logv("ERROR", message.as_ref());
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Builds `dir/{prefix}_{unix}_{NNNN}.{ext}`; every ephemeral file of a job is
/// named this way so two stages never collide within the same second.
pub fn media_path(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    let suffix = rand::thread_rng().gen_range(1000..10000);
    dir.join(format!("{}_{}_{}.{}", prefix, unix_now(), suffix, ext))
}

/// True when `path` is a regular file strictly larger than `min_bytes`.
pub(crate) async fn file_larger_than(path: &Path, min_bytes: u64) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > min_bytes)
        .unwrap_or(false)
}

/// Uniformly random element, cloned so no RNG handle outlives the call.
pub(crate) fn pick<T: Clone>(items: &[T]) -> Option<T> {
    items.choose(&mut rand::thread_rng()).cloned()
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
