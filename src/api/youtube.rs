use crate::{logi, logw};
use anyhow::{Context, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";

/// Chunk size for resumable uploads; must stay a multiple of 256 KiB.
pub const CHUNK_SIZE: usize = 1024 * 1024;
pub const MAX_CHUNK_RETRIES: u32 = 5;

#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

impl VideoMetadata {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "snippet": {
                "title": self.title,
                "description": self.description,
                "tags": self.tags,
                "categoryId": self.category_id,
            },
            "status": {
                "privacyStatus": "public",
                "selfDeclaredMadeForKids": false,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: Option<String>,
}

pub struct YouTubeClient {
    client: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl YouTubeClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<Self> {
        // Resumable uploads answer 308 without a Location; never follow it.
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        })
    }

    pub async fn refresh_access_token(&self) -> Result<String> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let resp = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .context("token refresh request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("token refresh HTTP {}: {}", status.as_u16(), body.chars().take(200).collect::<String>());
        }
        let token: TokenResponse = resp.json().await.context("token response parse failed")?;
        Ok(token.access_token)
    }

    /// Opens a resumable session and returns its upload URI.
    pub async fn start_session(&self, access_token: &str, meta: &VideoMetadata, total: u64) -> Result<String> {
        let resp = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", total.to_string())
            .json(&meta.to_json())
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .context("upload session request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("upload session HTTP {}: {}", status.as_u16(), body.chars().take(300).collect::<String>());
        }

        resp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .context("no Location header in upload session response")
    }

    /// Sends the file in [`CHUNK_SIZE`] pieces. Transient failures (network
    /// errors, 5xx, 429, a 308 that acknowledges nothing new) resend from the
    /// last acknowledged offset; more than [`MAX_CHUNK_RETRIES`] of them
    /// abandon the upload and yield `Ok(None)`.
    pub async fn upload_file(
        &self,
        access_token: &str,
        session_uri: &str,
        path: &Path,
        retry_pause: Duration,
    ) -> Result<Option<String>> {
        let data = fs::read(path)
            .await
            .with_context(|| format!("read upload file: {}", path.display()))?;
        let total = data.len();
        let mut offset = 0usize;
        let mut failures = 0u32;

        loop {
            let end = (offset + CHUNK_SIZE).min(total);
            let range = content_range(offset, end, total);
            let chunk = data[offset..end].to_vec();

            let sent = self
                .client
                .put(session_uri)
                .bearer_auth(access_token)
                .header(CONTENT_TYPE, "video/mp4")
                .header(CONTENT_LENGTH, chunk.len().to_string())
                .header(CONTENT_RANGE, range)
                .body(chunk)
                .timeout(Duration::from_secs(180))
                .send()
                .await;

            match sent {
                Ok(resp) if resp.status().is_success() => {
                    let video: VideoResource = resp.json().await.context("upload response parse failed")?;
                    return Ok(video.id);
                }
                Ok(resp) if resp.status() == StatusCode::PERMANENT_REDIRECT => {
                    let acknowledged = resp
                        .headers()
                        .get(RANGE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_acknowledged)
                        .map(|last| (last as usize + 1).min(total))
                        .unwrap_or(0);
                    if acknowledged > offset {
                        offset = acknowledged;
                        logi(format!("YouTube: {}% uploaded", offset * 100 / total));
                        continue;
                    }
                    // The session kept nothing new from this chunk.
                    offset = acknowledged;
                    failures += 1;
                    logw(format!("Chunk attempt {}: no progress past byte {}", failures, offset));
                }
                Ok(resp) if is_transient(resp.status()) => {
                    failures += 1;
                    logw(format!("Chunk attempt {}: HTTP {}", failures, resp.status().as_u16()));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    anyhow::bail!("upload HTTP {}: {}", status.as_u16(), body.chars().take(300).collect::<String>());
                }
                Err(err) => {
                    failures += 1;
                    logw(format!("Chunk attempt {}: {}", failures, err));
                }
            }

            if failures > MAX_CHUNK_RETRIES {
                logw("YouTube chunk retries exhausted, giving up");
                return Ok(None);
            }
            tokio::time::sleep(retry_pause).await;
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn content_range(offset: usize, end: usize, total: usize) -> String {
    if offset >= end {
        return format!("bytes */{}", total);
    }
    format!("bytes {}-{}/{}", offset, end - 1, total)
}

/// Last byte index from a `Range: bytes=0-N` acknowledgement.
fn parse_acknowledged(range: &str) -> Option<u64> {
    let (_, last) = range.trim().strip_prefix("bytes=")?.split_once('-')?;
    last.trim().parse().ok()
}
