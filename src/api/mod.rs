use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod edge_tts;
pub mod groq;
pub mod youtube;

/// One chat-style completion request.
#[derive(Debug, Clone)]
pub struct Completion<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: Completion<'_>) -> Result<String>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Writes speech for `text` spoken by `voice` into `out_path`.
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()>;

    async fn available(&self) -> bool;
}
