use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::api::SpeechSynthesizer;
use crate::ffmpeg::Transcoder;
use crate::retry::RetryPolicy;
use crate::{file_larger_than, logi, logok, logw, loge, media_path, pick};

pub const VOICES: [&str; 5] = [
    "en-US-JennyNeural",
    "en-US-ChristopherNeural",
    "en-US-GuyNeural",
    "en-GB-RyanNeural",
    "en-US-AriaNeural",
];

pub const VOICE_ATTEMPTS: usize = 3;
pub const SILENT_SECONDS: u32 = 15;

const MIN_SPEECH_BYTES: u64 = 500;
const MIN_SILENT_BYTES: u64 = 100;

pub struct Narrator<'a> {
    speech: &'a dyn SpeechSynthesizer,
    transcoder: &'a dyn Transcoder,
    output_dir: &'a Path,
    retry_pause: Duration,
}

impl<'a> Narrator<'a> {
    pub fn new(speech: &'a dyn SpeechSynthesizer, transcoder: &'a dyn Transcoder, output_dir: &'a Path) -> Self {
        Self {
            speech,
            transcoder,
            output_dir,
            retry_pause: Duration::from_secs(1),
        }
    }

    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    /// Speech for `text` with up to three random voices, then a silent track.
    pub async fn create_audio(&self, text: &str) -> Option<PathBuf> {
        let out = media_path(self.output_dir, "voice", "mp3");
        let policy = RetryPolicy::new(VOICE_ATTEMPTS).with_pause(self.retry_pause);

        let spoken = policy
            .run("Speech synthesis", |n| {
                let voice = pick(&VOICES).unwrap_or(VOICES[0]);
                let out = out.clone();
                async move {
                    logi(format!("Voice attempt {}/{}: {}", n + 1, VOICE_ATTEMPTS, voice));
                    self.speech.synthesize(text, voice, &out).await?;
                    if file_larger_than(&out, MIN_SPEECH_BYTES).await {
                        logok(format!("Narration ready: {}", out.display()));
                        Ok(Some(out))
                    } else {
                        logw(format!("Narration from {} too small, retrying", voice));
                        Ok(None)
                    }
                }
            })
            .await;

        match spoken {
            Some(path) => Some(path),
            None => {
                let _ = fs::remove_file(&out).await;
                logw("Speech synthesis failed, creating silent track");
                self.create_silent_audio().await
            }
        }
    }

    pub async fn create_silent_audio(&self) -> Option<PathBuf> {
        if !self.transcoder.available() {
            loge("ffmpeg missing, cannot create silent track");
            return None;
        }
        let out = media_path(self.output_dir, "silent", "mp3");
        if let Err(err) = self.transcoder.silent_audio(SILENT_SECONDS, &out).await {
            loge(format!("Silent track failed: {:#}", err));
        }
        if file_larger_than(&out, MIN_SILENT_BYTES).await {
            logok("Silent track created");
            Some(out)
        } else {
            let _ = fs::remove_file(&out).await;
            None
        }
    }
}
