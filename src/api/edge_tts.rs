use super::SpeechSynthesizer;
use crate::process::{program_available, run_checked};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const SYNTH_TIMEOUT: Duration = Duration::from_secs(60);

/// Neural speech through the `edge-tts` command-line client.
pub struct EdgeTts {
    bin: String,
}

impl EdgeTts {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTts {
    async fn synthesize(&self, text: &str, voice: &str, out_path: &Path) -> Result<()> {
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }

        let args = [
            "--voice".to_string(),
            voice.to_string(),
            "--text".to_string(),
            text.to_string(),
            "--write-media".to_string(),
            out_path.display().to_string(),
        ];
        run_checked(&self.bin, &args, SYNTH_TIMEOUT)
            .await
            .context("edge-tts synthesis failed")?;
        Ok(())
    }

    async fn available(&self) -> bool {
        program_available(&self.bin, "--help").await
    }
}
