use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::logw;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_refresh_token: Option<String>,
    pub port: u16,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    /// Wall-clock `HH:MM` times at which auto mode enqueues a job.
    pub schedule: Vec<String>,
    /// Lowercase word a search result title must contain.
    pub footage_keyword: String,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub ytdlp_bin: String,
    pub edge_tts_bin: String,
    pub pacing: Pacing,
}

/// Pauses the job runner inserts so a polling dashboard can follow along.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub stage_pause_ms: u64,
    pub settle_pause_ms: u64,
    pub idle_pause_ms: u64,
    pub upload_retry_pause_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            stage_pause_ms: 500,
            settle_pause_ms: 3000,
            idle_pause_ms: 1000,
            upload_retry_pause_ms: 3000,
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            stage_pause_ms: 0,
            settle_pause_ms: 0,
            idle_pause_ms: 0,
            upload_retry_pause_ms: 0,
        }
    }

    pub fn stage(&self) -> Duration {
        Duration::from_millis(self.stage_pause_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_pause_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_pause_ms)
    }

    pub fn upload_retry(&self) -> Duration {
        Duration::from_millis(self.upload_retry_pause_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_model: default_groq_model(),
            google_client_id: None,
            google_client_secret: None,
            google_refresh_token: None,
            port: 5000,
            output_dir: PathBuf::from("output"),
            logs_dir: PathBuf::from("logs"),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            schedule: vec!["09:00".to_string(), "19:00".to_string()],
            footage_keyword: "pubg".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            ytdlp_bin: "yt-dlp".to_string(),
            edge_tts_bin: "edge-tts".to_string(),
            pacing: Pacing::default(),
        }
    }
}

fn default_groq_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Defaults, then `config.json` when present, then the environment
    /// (including a `.env` file).
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if fs::metadata(&path).await.is_ok() {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = non_empty(lookup("GROQ_API_KEY")) {
            self.groq_api_key = Some(v);
        }
        if let Some(v) = non_empty(lookup("GROQ_MODEL")) {
            self.groq_model = v;
        }
        if let Some(v) = non_empty(lookup("GOOGLE_CLIENT_ID")) {
            self.google_client_id = Some(v);
        }
        if let Some(v) = non_empty(lookup("GOOGLE_CLIENT_SECRET")) {
            self.google_client_secret = Some(v);
        }
        if let Some(v) = non_empty(lookup("GOOGLE_REFRESH_TOKEN")) {
            self.google_refresh_token = Some(v);
        }
        if let Some(v) = non_empty(lookup("PORT")) {
            match v.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => logw(format!("Ignoring invalid PORT value: {}", v)),
            }
        }
        self.groq_api_key = non_empty(self.groq_api_key.take());
        self.google_client_id = non_empty(self.google_client_id.take());
        self.google_client_secret = non_empty(self.google_client_secret.take());
        self.google_refresh_token = non_empty(self.google_refresh_token.take());
    }

    pub fn warn_missing(&self) {
        if self.groq_api_key.is_none() {
            logw("GROQ_API_KEY missing; topics and scripts will use templates.");
        }
        if self.google_credentials().is_none() {
            logw("Google OAuth credentials incomplete; uploads will return placeholder URLs.");
        }
    }

    /// `(client_id, client_secret, refresh_token)` when all three are set.
    pub fn google_credentials(&self) -> Option<(&str, &str, &str)> {
        match (
            self.google_client_id.as_deref(),
            self.google_client_secret.as_deref(),
            self.google_refresh_token.as_deref(),
        ) {
            (Some(id), Some(secret), Some(token)) => Some((id, secret, token)),
            _ => None,
        }
    }

    /// Parsed schedule slots; malformed entries are skipped with a warning.
    pub fn schedule_times(&self) -> Vec<NaiveTime> {
        let mut out = Vec::new();
        for raw in &self.schedule {
            match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
                Ok(t) => out.push(t),
                Err(_) => logw(format!("Ignoring invalid schedule time: {}", raw)),
            }
        }
        out
    }
}
