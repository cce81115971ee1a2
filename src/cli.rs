use anyhow::{Context, Result};
use gameplay_shorts::config::Config;
use gameplay_shorts::content::ContentWriter;
use gameplay_shorts::generator::{Generator, Services};
use gameplay_shorts::init::{self, Dependencies};
use gameplay_shorts::status::SharedStatus;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::load("config.json").await?;
    gameplay_shorts::init_tracing(&cfg.logs_dir)?;
    cfg.warn_missing();

    init::ensure_directories(&cfg).await?;
    init::sweep_stale_media(&cfg.output_dir).await;

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let services = Services::from_config(&cfg).await;
    let content = Arc::new(ContentWriter::from_config(&cfg, client));
    let dependencies = Dependencies::probe(&services, &content).await;
    if !dependencies.ffmpeg {
        tracing::warn!("[WARN] FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let generator = Generator::new(&cfg, services, content, SharedStatus::new());
    let code = match generator.process_video().await {
        Some(url) => {
            println!("{}", url);
            0
        }
        None => {
            let last_error = generator.status().snapshot().errors.front().cloned();
            if let Some(line) = last_error {
                eprintln!("{}", line);
            }
            1
        }
    };
    std::process::exit(code);
}
