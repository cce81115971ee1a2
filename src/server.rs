use axum::extract::{Path as UrlPath, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::content::ContentWriter;
use crate::dashboard;
use crate::error::{ApiError, ApiResult};
use crate::init::Dependencies;
use crate::logi;
use crate::queue::{JobQueue, JobSource};
use crate::status::{JobState, Mode, SharedStatus, StatusRecord};

pub const TOPICS_PER_REQUEST: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub status: SharedStatus,
    pub queue: JobQueue,
    pub content: Arc<ContentWriter>,
    pub dependencies: Arc<Dependencies>,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub ffmpeg: bool,
    pub groq: bool,
    pub google: bool,
    pub edge_tts: bool,
    pub yt_dlp: bool,
    pub output_writable: bool,
}

pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(api_status))
        .route("/api/run", post(api_run))
        .route("/api/mode/{mode}", post(api_mode))
        .route("/api/topics", get(api_topics))
        .route("/api/check", get(api_check))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let path = state.templates_dir.join(dashboard::INDEX_FILE);
    match fs::read_to_string(&path).await {
        Ok(html) => Html(html),
        Err(_) => Html(dashboard::INDEX_HTML.to_string()),
    }
}

async fn api_status(State(state): State<AppState>) -> Json<StatusRecord> {
    state.status.set_queue_size(state.queue.len());
    Json(state.status.snapshot())
}

async fn api_run(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    if state.status.state() == JobState::Working {
        return Err(ApiError::bad_request("Bot is busy, please wait!"));
    }
    if !state.dependencies.ffmpeg {
        return Err(ApiError::internal("ffmpeg is not installed!"));
    }
    state.queue.enqueue(JobSource::Manual)?;
    Ok(Json(json!({ "success": true })))
}

async fn api_mode(State(state): State<AppState>, UrlPath(mode): UrlPath<String>) -> ApiResult<Json<Value>> {
    let parsed = Mode::parse(&mode).ok_or_else(|| ApiError::bad_request(format!("Unknown mode: {}", mode)))?;
    state.status.set_mode(parsed);
    logi(format!("Mode set to {}", mode.to_ascii_lowercase()));
    Ok(Json(json!({ "success": true })))
}

async fn api_topics(State(state): State<AppState>) -> Json<Vec<String>> {
    let mut topics = Vec::with_capacity(TOPICS_PER_REQUEST);
    for _ in 0..TOPICS_PER_REQUEST {
        topics.push(state.content.generate_unique_topic().await);
        state.status.bump_topics_generated();
    }
    Json(topics)
}

async fn api_check(State(state): State<AppState>) -> Json<CheckReport> {
    let deps = &state.dependencies;
    Json(CheckReport {
        ffmpeg: deps.ffmpeg,
        groq: deps.groq,
        google: deps.google,
        edge_tts: deps.edge_tts,
        yt_dlp: deps.yt_dlp,
        output_writable: dir_writable(&state.output_dir).await,
    })
}

/// Writes and removes a probe file.
async fn dir_writable(dir: &Path) -> bool {
    let probe = dir.join(".write_probe");
    let ok = fs::write(&probe, b"ok").await.is_ok();
    let _ = fs::remove_file(&probe).await;
    ok
}
