use crate::process::{program_available, run_checked};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub const PLACEHOLDER_SIZE: &str = "720x1280";
pub const PLACEHOLDER_FPS: u32 = 30;

const STAGE_TIMEOUT: Duration = Duration::from_secs(180);
const PLACEHOLDER_TIMEOUT: Duration = Duration::from_secs(60);
const SILENT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// The transcoder operations the pipeline relies on. Every method writes its
/// result to `out`; callers judge success by inspecting that file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    fn available(&self) -> bool;

    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Solid `color` (e.g. `0x1a1a2e`) clip of `seconds` at 720x1280.
    async fn color_clip(&self, color: &str, seconds: u32, out: &Path) -> Result<()>;

    async fn silent_audio(&self, seconds: u32, out: &Path) -> Result<()>;

    /// Re-encodes `input` through the `-vf` filter chain.
    async fn filter_video(&self, input: &Path, filter: &str, title: Option<&str>, out: &Path) -> Result<()>;

    /// Copies the video stream and adds `audio` as AAC, stopping at the
    /// shorter input.
    async fn mux_audio(&self, video: &Path, audio: &Path, out: &Path) -> Result<()>;

    /// Single-step re-encode of both streams; used when `mux_audio` fails.
    async fn simple_mux(&self, video: &Path, audio: &Path, out: &Path) -> Result<()>;
}

pub struct Ffmpeg {
    ffmpeg: String,
    ffprobe: String,
    available: bool,
}

impl Ffmpeg {
    /// Probes `ffmpeg -version` once; the answer is kept for the process
    /// lifetime.
    pub async fn detect(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        let ffmpeg = ffmpeg.into();
        let available = program_available(&ffmpeg, "-version").await;
        Self {
            ffmpeg,
            ffprobe: ffprobe.into(),
            available,
        }
    }

    async fn run(&self, args: Vec<String>, timeout: Duration) -> Result<()> {
        if !self.available {
            anyhow::bail!("ffmpeg is not available");
        }
        run_checked(&self.ffmpeg, &args, timeout).await?;
        Ok(())
    }
}

fn base_args() -> Vec<String> {
    vec!["-y".to_string(), "-hide_banner".to_string(), "-loglevel".to_string(), "error".to_string()]
}

#[async_trait]
impl Transcoder for Ffmpeg {
    fn available(&self) -> bool {
        self.available
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.display().to_string(),
        ];
        let output = run_checked(&self.ffprobe, &args, PROBE_TIMEOUT)
            .await
            .context("ffprobe duration failed")?;

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let duration = text.parse::<f64>().unwrap_or(-1.0);
        if duration <= 0.1 {
            return Err(anyhow::anyhow!("Invalid duration"));
        }
        Ok(duration)
    }

    async fn color_clip(&self, color: &str, seconds: u32, out: &Path) -> Result<()> {
        let mut args = base_args();
        args.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("color=c={}:s={}:d={}:r={}", color, PLACEHOLDER_SIZE, seconds, PLACEHOLDER_FPS),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "ultrafast".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-t".to_string(),
            seconds.to_string(),
            out.display().to_string(),
        ]);
        self.run(args, PLACEHOLDER_TIMEOUT).await
    }

    async fn silent_audio(&self, seconds: u32, out: &Path) -> Result<()> {
        let mut args = base_args();
        args.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            "anullsrc=r=44100:cl=stereo".to_string(),
            "-t".to_string(),
            seconds.to_string(),
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            "128k".to_string(),
            out.display().to_string(),
        ]);
        self.run(args, SILENT_TIMEOUT).await
    }

    async fn filter_video(&self, input: &Path, filter: &str, title: Option<&str>, out: &Path) -> Result<()> {
        let mut args = base_args();
        args.extend([
            "-i".to_string(),
            input.display().to_string(),
            "-vf".to_string(),
            filter.to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "ultrafast".to_string(),
            "-crf".to_string(),
            "23".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
        if let Some(title) = title {
            args.push("-metadata".to_string());
            args.push(format!("title={}", title));
        }
        args.push(out.display().to_string());
        self.run(args, STAGE_TIMEOUT).await
    }

    async fn mux_audio(&self, video: &Path, audio: &Path, out: &Path) -> Result<()> {
        let mut args = base_args();
        args.extend([
            "-i".to_string(),
            video.display().to_string(),
            "-i".to_string(),
            audio.display().to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-shortest".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            out.display().to_string(),
        ]);
        self.run(args, STAGE_TIMEOUT).await
    }

    async fn simple_mux(&self, video: &Path, audio: &Path, out: &Path) -> Result<()> {
        let mut args = base_args();
        args.extend([
            "-i".to_string(),
            video.display().to_string(),
            "-i".to_string(),
            audio.display().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-shortest".to_string(),
            "-preset".to_string(),
            "ultrafast".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            out.display().to_string(),
        ]);
        self.run(args, STAGE_TIMEOUT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_refuses_work() {
        let ff = Ffmpeg::detect("no-such-ffmpeg-binary", "no-such-ffprobe").await;
        assert!(!ff.available());
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.mp4");
        assert!(ff.color_clip("0x000000", 1, &out).await.is_err());
        assert!(!out.exists());
    }
}
