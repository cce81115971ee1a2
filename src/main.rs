use anyhow::{Context, Result};
use chrono::Local;
use gameplay_shorts::config::Config;
use gameplay_shorts::content::ContentWriter;
use gameplay_shorts::generator::{Generator, Services};
use gameplay_shorts::init::{self, Dependencies};
use gameplay_shorts::queue::JobQueue;
use gameplay_shorts::scheduler::Scheduler;
use gameplay_shorts::server::{AppState, create_router};
use gameplay_shorts::status::SharedStatus;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::load("config.json").await?;
    gameplay_shorts::init_tracing(&cfg.logs_dir)?;
    cfg.warn_missing();

    init::prepare(&cfg).await?;

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let services = Services::from_config(&cfg).await;
    let content = Arc::new(ContentWriter::from_config(&cfg, client));
    let dependencies = Arc::new(Dependencies::probe(&services, &content).await);
    let status = SharedStatus::new();

    let generator = Arc::new(Generator::new(&cfg, services, content.clone(), status.clone()));
    let (queue, _worker) = JobQueue::start(generator, status.clone());

    let times = cfg.schedule_times();
    let slots: Vec<String> = times.iter().map(|t| t.format("%H:%M").to_string()).collect();
    let _scheduler = Scheduler::new(times, queue.clone(), status.clone(), Local::now().naive_local()).spawn();

    let state = AppState {
        status,
        queue,
        content,
        dependencies,
        templates_dir: cfg.templates_dir.clone(),
        output_dir: cfg.output_dir.clone(),
    };
    let app = create_router(state, &cfg.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!("Web: http://localhost:{}", cfg.port);
    tracing::info!("Auto runs at: {}", slots.join(", "));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running web server")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", err);
    }
}
