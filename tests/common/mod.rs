#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use gameplay_shorts::api::SpeechSynthesizer;
use gameplay_shorts::config::{Config, Pacing};
use gameplay_shorts::ffmpeg::Transcoder;
use gameplay_shorts::footage::{Candidate, FootageSource};
use gameplay_shorts::generator::Services;
use gameplay_shorts::publisher::Publisher;
use gameplay_shorts::status::SharedStatus;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const STUB_URL: &str = "https://www.youtube.com/shorts/stubbed123";

pub fn test_config(dir: &Path) -> Config {
    Config {
        output_dir: dir.join("output"),
        logs_dir: dir.join("logs"),
        templates_dir: dir.join("templates"),
        static_dir: dir.join("static"),
        pacing: Pacing::none(),
        ..Config::default()
    }
}

/// Progress values observed by the stubs while a job runs.
#[derive(Clone, Default)]
pub struct ProgressLog {
    status: Option<SharedStatus>,
    seen: Arc<Mutex<Vec<u8>>>,
}

impl ProgressLog {
    pub fn watching(status: &SharedStatus) -> Self {
        Self {
            status: Some(status.clone()),
            seen: Arc::default(),
        }
    }

    fn record(&self) {
        if let Some(status) = &self.status {
            self.seen.lock().unwrap().push(status.snapshot().progress);
        }
    }

    pub fn values(&self) -> Vec<u8> {
        self.seen.lock().unwrap().clone()
    }
}

fn write_bytes(path: &Path, len: usize) -> Result<()> {
    std::fs::write(path, vec![0u8; len])?;
    Ok(())
}

pub struct StubSpeech {
    pub works: bool,
    pub progress: ProgressLog,
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    async fn synthesize(&self, _text: &str, _voice: &str, out_path: &Path) -> Result<()> {
        self.progress.record();
        if !self.works {
            anyhow::bail!("no route to speech service");
        }
        write_bytes(out_path, 4_000)
    }

    async fn available(&self) -> bool {
        self.works
    }
}

pub struct StubFootage {
    pub works: bool,
    pub progress: ProgressLog,
}

#[async_trait]
impl FootageSource for StubFootage {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<Candidate>> {
        self.progress.record();
        if !self.works {
            anyhow::bail!("search unavailable");
        }
        Ok(vec![
            Candidate {
                id: Some("keep".into()),
                title: Some(format!("PUBG Mobile {}", query)),
                duration: Some(95.0),
                webpage_url: Some("https://www.youtube.com/watch?v=keep".into()),
                url: None,
            },
            Candidate {
                id: Some("long".into()),
                title: Some("PUBG full match".into()),
                duration: Some(1800.0),
                webpage_url: Some("https://www.youtube.com/watch?v=long".into()),
                url: None,
            },
        ])
    }

    async fn download(&self, candidate: &Candidate, dir: &Path, stem: &str) -> Result<()> {
        assert_eq!(candidate.id.as_deref(), Some("keep"));
        write_bytes(&dir.join(format!("{}.mp4", stem)), 600_000)
    }

    async fn available(&self) -> bool {
        self.works
    }
}

pub struct StubTranscoder {
    pub available: bool,
    pub progress: ProgressLog,
}

#[async_trait]
impl Transcoder for StubTranscoder {
    fn available(&self) -> bool {
        self.available
    }

    async fn probe_duration(&self, _path: &Path) -> Result<f64> {
        Ok(14.2)
    }

    async fn color_clip(&self, _color: &str, _seconds: u32, out: &Path) -> Result<()> {
        self.progress.record();
        write_bytes(out, 5_000)
    }

    async fn silent_audio(&self, _seconds: u32, out: &Path) -> Result<()> {
        write_bytes(out, 500)
    }

    async fn filter_video(&self, _input: &Path, _filter: &str, _title: Option<&str>, out: &Path) -> Result<()> {
        self.progress.record();
        write_bytes(out, 5_000)
    }

    async fn mux_audio(&self, _video: &Path, _audio: &Path, out: &Path) -> Result<()> {
        self.progress.record();
        write_bytes(out, 5_000)
    }

    async fn simple_mux(&self, _video: &Path, _audio: &Path, out: &Path) -> Result<()> {
        write_bytes(out, 5_000)
    }
}

#[derive(Default)]
pub struct StubPublisher {
    pub uploaded: Mutex<Vec<(PathBuf, String)>>,
    pub progress: ProgressLog,
}

#[async_trait]
impl Publisher for StubPublisher {
    async fn publish(&self, path: &Path, title: &str, _description: &str) -> String {
        self.progress.record();
        assert!(path.exists(), "upload target must exist at publish time");
        self.uploaded
            .lock()
            .unwrap()
            .push((path.to_path_buf(), title.to_string()));
        STUB_URL.to_string()
    }

    fn configured(&self) -> bool {
        true
    }
}

pub struct StubSet {
    pub services: Services,
    pub publisher: Arc<StubPublisher>,
}

/// All collaborators stubbed; `footage_works` and `transcoder` toggle the
/// degraded paths.
pub fn stubs(progress: &ProgressLog, footage_works: bool, transcoder: bool) -> StubSet {
    let publisher = Arc::new(StubPublisher {
        uploaded: Mutex::new(Vec::new()),
        progress: progress.clone(),
    });
    let services = Services {
        speech: Arc::new(StubSpeech {
            works: true,
            progress: progress.clone(),
        }),
        footage: Arc::new(StubFootage {
            works: footage_works,
            progress: progress.clone(),
        }),
        transcoder: Arc::new(StubTranscoder {
            available: transcoder,
            progress: progress.clone(),
        }),
        publisher: publisher.clone(),
    };
    StubSet { services, publisher }
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}
