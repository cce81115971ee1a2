use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::ffmpeg::Transcoder;
use crate::process::{program_available, run_checked};
use crate::retry::RetryPolicy;
use crate::{file_larger_than, logi, logok, logw, loge, pick, unix_now};

pub const SEARCH_ATTEMPTS: usize = 5;
pub const SEARCH_RESULTS: usize = 20;
pub const MIN_DURATION_SECS: f64 = 20.0;
pub const MAX_DURATION_SECS: f64 = 300.0;
pub const PLACEHOLDER_SECONDS: u32 = 20;

const MIN_DOWNLOAD_BYTES: u64 = 500_000;
const MIN_PLACEHOLDER_BYTES: u64 = 1000;
const DOWNLOAD_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mkv"];
const PLACEHOLDER_COLORS: [&str; 5] = ["0x1a1a2e", "0x16213e", "0x0f3460", "0x2c3e50", "0x1e3a5f"];

const SEARCH_TIMEOUT: Duration = Duration::from_secs(120);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(180);

/// One search hit as reported by the search tool.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Candidate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Candidate {
    pub fn link(&self) -> Option<&str> {
        self.webpage_url.as_deref().or(self.url.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    entries: Vec<Option<Candidate>>,
}

#[async_trait]
pub trait FootageSource: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>>;

    /// Downloads `candidate` to `{stem}.{ext}` inside `dir`.
    async fn download(&self, candidate: &Candidate, dir: &Path, stem: &str) -> Result<()>;

    async fn available(&self) -> bool;
}

pub struct YtDlp {
    bin: String,
}

impl YtDlp {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

pub(crate) fn parse_search_results(raw: &[u8]) -> Result<Vec<Candidate>> {
    let results: SearchResults = serde_json::from_slice(raw).context("parsing yt-dlp search response")?;
    Ok(results.entries.into_iter().flatten().collect())
}

#[async_trait]
impl FootageSource for YtDlp {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let args = [
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            "30".to_string(),
            format!("ytsearch{}:{}", limit, query),
        ];
        let output = run_checked(&self.bin, &args, SEARCH_TIMEOUT).await?;
        parse_search_results(&output.stdout)
    }

    async fn download(&self, candidate: &Candidate, dir: &Path, stem: &str) -> Result<()> {
        let link = candidate.link().context("candidate has no link")?;
        let template = dir.join(format!("{}.%(ext)s", stem));
        let args = [
            "-f".to_string(),
            "best[height<=720][ext=mp4]/best[height<=720]/best".to_string(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            "30".to_string(),
            "--retries".to_string(),
            "3".to_string(),
            "-o".to_string(),
            template.display().to_string(),
            link.to_string(),
        ];
        run_checked(&self.bin, &args, DOWNLOAD_TIMEOUT).await?;
        Ok(())
    }

    async fn available(&self) -> bool {
        program_available(&self.bin, "--version").await
    }
}

/// Keeps results whose duration lies strictly inside (20, 300) seconds and
/// whose title contains `keyword`, case-insensitively.
pub fn filter_candidates(results: Vec<Candidate>, keyword: &str) -> Vec<Candidate> {
    let keyword = keyword.to_lowercase();
    results
        .into_iter()
        .filter(|c| {
            let dur = c.duration.unwrap_or(0.0);
            let title = c.title.as_deref().unwrap_or("").to_lowercase();
            dur > MIN_DURATION_SECS && dur < MAX_DURATION_SECS && title.contains(&keyword) && c.link().is_some()
        })
        .collect()
}

pub fn search_queries(topic: &str) -> Vec<String> {
    let mut queries = vec![
        format!("PUBG Mobile {} gameplay", topic),
        format!("PUBG Mobile {} highlights", topic),
    ];
    queries.extend(
        [
            "PUBG Mobile pro gameplay no commentary",
            "PUBG Mobile best moments 4k",
            "PUBG Mobile squad gameplay",
            "PUBG Mobile solo vs squad",
            "PUBG Mobile chicken dinner gameplay",
            "PUBG Mobile action gameplay",
            "PUBG Mobile ranked match gameplay",
            "PUBG Mobile tournament gameplay",
            "PUBG Mobile Livik gameplay",
            "PUBG Mobile Sanhok gameplay",
            "PUBG Mobile Miramar gameplay",
            "PUBG Mobile Erangel gameplay",
        ]
        .iter()
        .map(|q| q.to_string()),
    );
    queries
}

/// First file `dir/{stem}.{mp4,webm,mkv}` larger than 500 KB.
async fn find_download(dir: &Path, stem: &str) -> Option<PathBuf> {
    for ext in DOWNLOAD_EXTENSIONS {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if file_larger_than(&candidate, MIN_DOWNLOAD_BYTES).await {
            return Some(candidate);
        }
    }
    None
}

pub struct FootageAcquirer<'a> {
    source: &'a dyn FootageSource,
    transcoder: &'a dyn Transcoder,
    output_dir: &'a Path,
    keyword: &'a str,
}

impl<'a> FootageAcquirer<'a> {
    pub fn new(
        source: &'a dyn FootageSource,
        transcoder: &'a dyn Transcoder,
        output_dir: &'a Path,
        keyword: &'a str,
    ) -> Self {
        Self {
            source,
            transcoder,
            output_dir,
            keyword,
        }
    }

    /// Up to five searches with random queries; `None` when nothing usable
    /// was downloaded.
    pub async fn download_gameplay(&self, topic: &str) -> Option<PathBuf> {
        let stem = format!("pubg_{}_{}", unix_now(), rand::random::<u16>() % 900 + 100);
        let queries = search_queries(topic);

        let found = RetryPolicy::new(SEARCH_ATTEMPTS)
            .run("Footage search", |n| {
                let query = pick(&queries).unwrap_or_else(|| queries[0].clone());
                let stem = stem.as_str();
                async move {
                    logi(format!("Search attempt {}/{}: {}", n + 1, SEARCH_ATTEMPTS, query));
                    let results = self.source.search(&query, SEARCH_RESULTS).await?;
                    let candidates = filter_candidates(results, self.keyword);
                    let Some(video) = pick(&candidates) else {
                        return Ok(None);
                    };
                    let title = video.title.clone().unwrap_or_else(|| "Unknown".to_string());
                    logi(format!("Footage found: {}", title.chars().take(100).collect::<String>()));
                    self.source.download(&video, self.output_dir, stem).await?;
                    match find_download(self.output_dir, stem).await {
                        Some(path) => {
                            logok(format!("Footage downloaded: {}", path.display()));
                            Ok(Some(path))
                        }
                        None => Ok(None),
                    }
                }
            })
            .await;

        if found.is_none() {
            for ext in DOWNLOAD_EXTENSIONS {
                let _ = fs::remove_file(self.output_dir.join(format!("{}.{}", stem, ext))).await;
            }
            logw("No gameplay footage found, a placeholder will be used");
        }
        found
    }

    /// Solid-color placeholder clip; `None` when the transcoder is missing or
    /// fails.
    pub async fn create_fallback_video(&self, seconds: u32) -> Option<PathBuf> {
        if !self.transcoder.available() {
            loge("ffmpeg missing, cannot create placeholder video");
            return None;
        }

        let color = pick(&PLACEHOLDER_COLORS).unwrap_or(PLACEHOLDER_COLORS[0]);
        let out = crate::media_path(self.output_dir, "fallback", "mp4");
        logi("Creating placeholder video...");
        if let Err(err) = self.transcoder.color_clip(color, seconds, &out).await {
            loge(format!("Placeholder video failed: {:#}", err));
        }
        if file_larger_than(&out, MIN_PLACEHOLDER_BYTES).await {
            logok(format!("Placeholder video created: {}", out.display()));
            Some(out)
        } else {
            let _ = fs::remove_file(&out).await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, duration: Option<f64>) -> Candidate {
        Candidate {
            id: None,
            title: Some(title.to_string()),
            duration,
            webpage_url: Some("https://www.youtube.com/watch?v=x".to_string()),
            url: None,
        }
    }

    #[test]
    fn filter_bounds_are_exclusive() {
        let kept = filter_candidates(
            vec![
                candidate("PUBG clutch", Some(20.0)),
                candidate("PUBG clutch", Some(20.5)),
                candidate("PUBG clutch", Some(299.9)),
                candidate("PUBG clutch", Some(300.0)),
                candidate("PUBG clutch", None),
            ],
            "pubg",
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn filter_requires_keyword_case_insensitive() {
        let kept = filter_candidates(
            vec![
                candidate("Pubg Mobile ace", Some(60.0)),
                candidate("Fortnite build fight", Some(60.0)),
            ],
            "PUBG",
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title.as_deref(), Some("Pubg Mobile ace"));
    }

    #[test]
    fn filter_drops_linkless_entries() {
        let mut c = candidate("PUBG", Some(60.0));
        c.webpage_url = None;
        assert!(filter_candidates(vec![c], "pubg").is_empty());
    }

    #[test]
    fn parses_flat_search_output() {
        let raw = br#"{"_type":"playlist","entries":[
            {"id":"a","title":"PUBG Mobile 1v4","duration":95.0,"url":"https://www.youtube.com/watch?v=a"},
            null,
            {"id":"b","title":"no duration","url":"https://www.youtube.com/watch?v=b"}
        ]}"#;
        let results = parse_search_results(raw).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].link(), Some("https://www.youtube.com/watch?v=a"));
        assert_eq!(results[1].duration, None);
    }

    #[test]
    fn queries_include_topic() {
        let q = search_queries("AWM");
        assert_eq!(q.len(), 14);
        assert!(q[0].contains("AWM"));
    }
}
