use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use gameplay_shorts::content::ContentWriter;
use gameplay_shorts::init::Dependencies;
use gameplay_shorts::queue::{JobQueue, JobRunner};
use gameplay_shorts::server::{AppState, TOPICS_PER_REQUEST, create_router};
use gameplay_shorts::status::{Mode, SharedStatus, Update};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

#[derive(Default)]
struct CountingRunner {
    runs: AtomicUsize,
}

#[async_trait]
impl JobRunner for CountingRunner {
    async fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    app: Router,
    status: SharedStatus,
    runner: Arc<CountingRunner>,
}

fn harness(dir: &Path, ffmpeg: bool) -> Harness {
    let status = SharedStatus::new();
    let runner = Arc::new(CountingRunner::default());
    let (queue, _worker) = JobQueue::start(runner.clone(), status.clone());
    let output_dir = dir.join("output");
    std::fs::create_dir_all(&output_dir).unwrap();

    let state = AppState {
        status: status.clone(),
        queue,
        content: Arc::new(ContentWriter::new(None)),
        dependencies: Arc::new(Dependencies {
            ffmpeg,
            yt_dlp: true,
            ..Dependencies::default()
        }),
        templates_dir: dir.join("templates"),
        output_dir,
    };
    Harness {
        app: create_router(state, &dir.join("static")),
        status,
        runner,
    }
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn status_reports_the_shared_record() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), true);
    h.status.update(Update::working("Searching footage").progress(50).topic("AWM angles"));

    let (code, body) = send(&h.app, "GET", "/api/status").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "working");
    assert_eq!(body["mode"], "auto");
    assert_eq!(body["progress"], 50);
    assert_eq!(body["current_topic"], "AWM angles");
    assert_eq!(body["queue_size"], 0);
    assert!(body["logs"][0].as_str().unwrap().ends_with("Searching footage"));
}

#[tokio::test]
async fn run_enqueues_a_job() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), true);

    let (code, body) = send(&h.app, "POST", "/api/run").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["success"], true);

    for _ in 0..100 {
        if h.runner.runs.load(Ordering::SeqCst) == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never ran");
}

#[tokio::test]
async fn run_is_rejected_while_working() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), true);
    h.status.update(Update::working("busy").progress(30));

    let (code, body) = send(&h.app, "POST", "/api/run").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("busy"));
    assert_eq!(h.runner.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_without_ffmpeg_is_a_server_error() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), false);

    let (code, body) = send(&h.app, "POST", "/api/run").await;
    assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("ffmpeg"));
}

#[tokio::test]
async fn mode_switches_and_rejects_unknown() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), true);

    let (code, body) = send(&h.app, "POST", "/api/mode/manual").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(h.status.mode(), Mode::Manual);

    let (code, _) = send(&h.app, "POST", "/api/mode/auto").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(h.status.mode(), Mode::Auto);

    let (code, body) = send(&h.app, "POST", "/api/mode/turbo").await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("turbo"));
    assert_eq!(h.status.mode(), Mode::Auto);
}

#[tokio::test]
async fn topics_are_fresh_and_counted() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), true);

    let (code, body) = send(&h.app, "GET", "/api/topics").await;
    assert_eq!(code, StatusCode::OK);
    let topics: Vec<String> = serde_json::from_value(body).unwrap();
    assert_eq!(topics.len(), TOPICS_PER_REQUEST);
    let mut unique = topics.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), TOPICS_PER_REQUEST);
    assert_eq!(h.status.snapshot().topics_generated, TOPICS_PER_REQUEST as u64);
}

#[tokio::test]
async fn check_lists_every_dependency() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), true);

    let (code, body) = send(&h.app, "GET", "/api/check").await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["ffmpeg"], true);
    assert_eq!(body["groq"], false);
    assert_eq!(body["google"], false);
    assert_eq!(body["edge_tts"], false);
    assert_eq!(body["yt_dlp"], true);
    assert_eq!(body["output_writable"], true);
}

#[tokio::test]
async fn index_serves_dashboard() {
    let dir = tempdir().unwrap();
    let h = harness(dir.path(), true);

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/api/status"));
}
