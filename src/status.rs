use chrono::Local;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::logi;

pub const LOG_MAX_LINES: usize = 50;
pub const ERROR_MAX_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Working,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Auto,
    Manual,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "auto" => Some(Mode::Auto),
            "manual" => Some(Mode::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusRecord {
    pub status: JobState,
    pub message: String,
    pub mode: Mode,
    pub total_videos: u64,
    pub last_video_url: Option<String>,
    pub last_run: Option<String>,
    pub next_run: Option<String>,
    /// Newest entry first.
    pub logs: VecDeque<String>,
    pub progress: u8,
    pub current_topic: String,
    pub queue_size: usize,
    pub topics_generated: u64,
    pub errors: VecDeque<String>,
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            status: JobState::Idle,
            message: "Bot ready".to_string(),
            mode: Mode::Auto,
            total_videos: 0,
            last_video_url: None,
            last_run: None,
            next_run: None,
            logs: VecDeque::with_capacity(LOG_MAX_LINES),
            progress: 0,
            current_topic: String::new(),
            queue_size: 0,
            topics_generated: 0,
            errors: VecDeque::new(),
        }
    }
}

impl StatusRecord {
    fn push_log_line(&mut self, line: String) {
        self.logs.push_front(line);
        self.logs.truncate(LOG_MAX_LINES);
    }

    fn push_error(&mut self, line: String) {
        self.errors.push_front(line);
        self.errors.truncate(ERROR_MAX_LINES);
    }
}

/// One status update: message plus the optional fields that change with it.
#[derive(Debug, Clone)]
pub struct Update<'a> {
    pub message: &'a str,
    pub status: JobState,
    pub progress: Option<u8>,
    pub topic: Option<&'a str>,
}

impl<'a> Update<'a> {
    pub fn working(message: &'a str) -> Self {
        Self {
            message,
            status: JobState::Working,
            progress: None,
            topic: None,
        }
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn topic(mut self, topic: &'a str) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn state(mut self, status: JobState) -> Self {
        self.status = status;
        self
    }
}

/// The status record shared by the web layer, the scheduler and the worker.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<Mutex<StatusRecord>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StatusRecord> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> StatusRecord {
        self.lock().clone()
    }

    pub fn update(&self, update: Update<'_>) {
        {
            let mut guard = self.lock();
            guard.message = update.message.to_string();
            guard.status = update.status;
            if let Some(progress) = update.progress {
                guard.progress = progress.min(100);
            }
            if let Some(topic) = update.topic {
                if !topic.is_empty() {
                    guard.current_topic = topic.to_string();
                }
            }
            let ts = Local::now().format("%H:%M:%S");
            guard.push_log_line(format!("[{}] {}", ts, update.message));
            if update.status == JobState::Error {
                guard.push_error(format!("[{}] {}", ts, update.message));
            }
        }
        logi(update.message);
    }

    pub fn state(&self) -> JobState {
        self.lock().status
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn set_mode(&self, mode: Mode) {
        self.lock().mode = mode;
    }

    pub fn set_queue_size(&self, size: usize) {
        self.lock().queue_size = size;
    }

    pub fn set_next_run(&self, next: Option<String>) {
        self.lock().next_run = next;
    }

    pub fn bump_topics_generated(&self) {
        self.lock().topics_generated += 1;
    }

    pub fn record_published(&self, url: &str) {
        let mut guard = self.lock();
        guard.total_videos += 1;
        guard.last_video_url = Some(url.to_string());
        guard.last_run = Some(Local::now().format("%H:%M").to_string());
    }
}
