use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::api::youtube::{VideoMetadata, YouTubeClient};
use crate::config::Config;
use crate::{logi, logok, logw, loge, truncate_chars, unix_now};

const TITLE_MAX_CHARS: usize = 90;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Uploads `path` and returns a share URL. Never fails: unavailable
    /// credentials or API errors produce a placeholder URL instead.
    async fn publish(&self, path: &Path, title: &str, description: &str) -> String;

    fn configured(&self) -> bool;
}

pub fn placeholder_url(kind: &str) -> String {
    format!("https://youtube.com/shorts/{}_{}", kind, unix_now())
}

pub fn shorts_url(video_id: &str) -> String {
    format!("https://www.youtube.com/shorts/{}", video_id)
}

pub fn build_metadata(title: &str, description: &str) -> VideoMetadata {
    let safe_title = truncate_chars(title, TITLE_MAX_CHARS);
    VideoMetadata {
        title: format!("{} 🔥 PUBG Mobile #Shorts", safe_title.trim()),
        description: format!("{}\n\n#PUBGMobile #Shorts #Gaming #PUBG #Tips", description),
        tags: ["PUBG Mobile", "Shorts", "Gaming", "PUBG", "Tips"]
            .iter()
            .map(|t| t.to_string())
            .collect(),
        category_id: "20".to_string(),
    }
}

pub struct YouTubePublisher {
    client: Option<YouTubeClient>,
    retry_pause: Duration,
}

impl YouTubePublisher {
    pub fn from_config(cfg: &Config) -> Self {
        let client = match cfg.google_credentials() {
            Some((id, secret, token)) => match YouTubeClient::new(id, secret, token) {
                Ok(client) => Some(client),
                Err(err) => {
                    logw(format!("YouTube client unavailable: {:#}", err));
                    None
                }
            },
            None => None,
        };
        Self {
            client,
            retry_pause: cfg.pacing.upload_retry(),
        }
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    async fn publish(&self, path: &Path, title: &str, description: &str) -> String {
        let Some(client) = self.client.as_ref() else {
            logw("Google credentials incomplete");
            return placeholder_url("noauth");
        };

        let token = match client.refresh_access_token().await {
            Ok(token) => {
                logok("Google token refreshed");
                token
            }
            Err(err) => {
                loge(format!("Token refresh failed: {:#}", err));
                return placeholder_url("token_error");
            }
        };

        let meta = build_metadata(title, description);
        let total = match tokio::fs::metadata(path).await {
            Ok(m) => m.len(),
            Err(err) => {
                loge(format!("YouTube upload failed: cannot stat {}: {}", path.display(), err));
                return placeholder_url("error");
            }
        };

        let session = match client.start_session(&token, &meta, total).await {
            Ok(uri) => uri,
            Err(err) => {
                loge(format!("YouTube upload failed: {:#}", err));
                return placeholder_url("error");
            }
        };

        logi(format!("Uploading {} ({} bytes)", path.display(), total));
        match client.upload_file(&token, &session, path, self.retry_pause).await {
            Ok(Some(id)) => {
                let url = shorts_url(&id);
                logok(format!("YouTube: {}", url));
                url
            }
            Ok(None) => {
                loge("YouTube response had no video id");
                placeholder_url("upload_failed")
            }
            Err(err) => {
                loge(format!("YouTube upload failed: {:#}", err));
                placeholder_url("error")
            }
        }
    }

    fn configured(&self) -> bool {
        self.client.is_some()
    }
}
