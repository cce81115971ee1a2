use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

use crate::config::Config;
use crate::content::ContentWriter;
use crate::dashboard;
use crate::generator::Services;
use crate::{logi, logok, logw};

/// Extensions of files the pipeline leaves in the output directory, including
/// partial downloads.
const STALE_EXTENSIONS: &[&str] = &["mp4", "mp3", "webm", "mkv", "m4a", "part", "ytdl"];

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in [&cfg.output_dir, &cfg.logs_dir, &cfg.templates_dir, &cfg.static_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

/// Removes media left behind by a run that was interrupted before cleanup.
/// Returns how many files were deleted.
pub async fn sweep_stale_media(output_dir: &Path) -> usize {
    let stale: Vec<_> = WalkDir::new(output_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| STALE_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    let mut removed = 0;
    for path in stale {
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(err) => logw(format!("Could not remove stale {}: {}", path.display(), err)),
        }
    }
    if removed > 0 {
        logok(format!("Removed {} stale media file(s) from {}", removed, output_dir.display()));
    }
    removed
}

/// Availability of every optional dependency, probed once at startup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dependencies {
    pub ffmpeg: bool,
    pub groq: bool,
    pub google: bool,
    pub edge_tts: bool,
    pub yt_dlp: bool,
}

impl Dependencies {
    pub async fn probe(services: &Services, content: &ContentWriter) -> Self {
        let deps = Self {
            ffmpeg: services.transcoder.available(),
            groq: content.has_generator(),
            google: services.publisher.configured(),
            edge_tts: services.speech.available().await,
            yt_dlp: services.footage.available().await,
        };
        deps.log();
        deps
    }

    fn log(&self) {
        let report = [
            ("ffmpeg", self.ffmpeg),
            ("Groq", self.groq),
            ("Google", self.google),
            ("edge-tts", self.edge_tts),
            ("yt-dlp", self.yt_dlp),
        ];
        for (name, ok) in report {
            if ok {
                logok(format!("{} available", name));
            } else {
                logw(format!("{} unavailable, the related stage will degrade", name));
            }
        }
    }
}

/// Directory setup, stale sweep and dashboard template.
pub async fn prepare(cfg: &Config) -> Result<()> {
    ensure_directories(cfg).await?;
    sweep_stale_media(&cfg.output_dir).await;
    dashboard::write_template(&cfg.templates_dir).await?;
    Ok(())
}
