use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

use crate::api::SpeechSynthesizer;
use crate::api::edge_tts::EdgeTts;
use crate::config::{Config, Pacing};
use crate::content::ContentWriter;
use crate::effects::EffectsPipeline;
use crate::ffmpeg::{Ffmpeg, Transcoder};
use crate::footage::{FootageAcquirer, FootageSource, PLACEHOLDER_SECONDS, YtDlp};
use crate::narration::Narrator;
use crate::publisher::{Publisher, YouTubePublisher};
use crate::queue::JobRunner;
use crate::status::{JobState, SharedStatus, Update};
use crate::{loge, logi, logok, logw, truncate_chars};

const ERROR_MESSAGE_CHARS: usize = 50;

/// External collaborators of one job.
#[derive(Clone)]
pub struct Services {
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub footage: Arc<dyn FootageSource>,
    pub transcoder: Arc<dyn Transcoder>,
    pub publisher: Arc<dyn Publisher>,
}

impl Services {
    /// The real tool-backed implementations.
    pub async fn from_config(cfg: &Config) -> Self {
        Self {
            speech: Arc::new(EdgeTts::new(cfg.edge_tts_bin.clone())),
            footage: Arc::new(YtDlp::new(cfg.ytdlp_bin.clone())),
            transcoder: Arc::new(Ffmpeg::detect(cfg.ffmpeg_bin.clone(), cfg.ffprobe_bin.clone()).await),
            publisher: Arc::new(YouTubePublisher::from_config(cfg)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// A stage with no local substitute produced nothing.
    #[error("{0}")]
    Stage(&'static str),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobError {
    fn status_message(&self) -> String {
        match self {
            JobError::Stage(message) => format!("❌ {}", message),
            JobError::Other(err) => format!("❌ Error: {}", truncate_chars(&err.to_string(), ERROR_MESSAGE_CHARS)),
        }
    }
}

/// Runs the topic → script → narration → footage → edit → upload chain.
pub struct Generator {
    services: Services,
    content: Arc<ContentWriter>,
    status: SharedStatus,
    output_dir: PathBuf,
    footage_keyword: String,
    pacing: Pacing,
}

impl Generator {
    pub fn new(cfg: &Config, services: Services, content: Arc<ContentWriter>, status: SharedStatus) -> Self {
        Self {
            services,
            content,
            status,
            output_dir: cfg.output_dir.clone(),
            footage_keyword: cfg.footage_keyword.clone(),
            pacing: cfg.pacing,
        }
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    fn report(&self, message: &str, progress: u8) {
        self.status.update(Update::working(message).progress(progress));
    }

    async fn stage_pause(&self) {
        pause(self.pacing.stage()).await;
    }

    /// One full job. Returns the published URL on success. Every file the job
    /// created is removed before returning and the status goes back to idle.
    pub async fn process_video(&self) -> Option<String> {
        let mut files_to_clean: Vec<PathBuf> = Vec::new();

        let outcome = self.run_stages(&mut files_to_clean).await;
        let url = match outcome {
            Ok(url) => Some(url),
            Err(err) => {
                loge(format!("Job failed: {:#}", err));
                let message = err.status_message();
                self.status
                    .update(Update::working(&message).state(JobState::Error).progress(0));
                None
            }
        };

        self.cleanup(&files_to_clean).await;
        url
    }

    async fn run_stages(&self, files_to_clean: &mut Vec<PathBuf>) -> Result<String, JobError> {
        self.report("🔄 Job started...", 5);
        fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        self.report("🎯 Generating topic...", 10);
        let topic = self.content.generate_unique_topic().await;
        self.status.bump_topics_generated();
        let message = format!("📌 Topic: {}", topic);
        self.status.update(Update::working(&message).progress(15).topic(&topic));
        self.stage_pause().await;

        self.report("📝 Writing script...", 20);
        let script = self.content.generate_unique_script(&topic).await;
        self.report("✅ Script ready", 25);
        self.stage_pause().await;

        self.report("🎙️ Recording narration...", 30);
        let narrator = Narrator::new(self.services.speech.as_ref(), self.services.transcoder.as_ref(), &self.output_dir)
            .with_retry_pause(self.pacing.stage());
        let audio = narrator
            .create_audio(&script)
            .await
            .ok_or(JobError::Stage("Narration could not be created!"))?;
        files_to_clean.push(audio.clone());
        self.report("✅ Narration ready", 40);
        self.stage_pause().await;

        self.report("🔍 Searching PUBG Mobile footage...", 50);
        let acquirer = FootageAcquirer::new(
            self.services.footage.as_ref(),
            self.services.transcoder.as_ref(),
            &self.output_dir,
            &self.footage_keyword,
        );
        let video = match acquirer.download_gameplay(&topic).await {
            Some(path) => Some(path),
            None => {
                self.report("⚠️ No footage found, creating placeholder video...", 55);
                acquirer.create_fallback_video(PLACEHOLDER_SECONDS).await
            }
        };
        let video = video.ok_or(JobError::Stage("No video available!"))?;
        files_to_clean.push(video.clone());
        self.report("✅ Footage ready", 60);
        self.stage_pause().await;

        self.report("✨ Editing premium video...", 70);
        let effects = EffectsPipeline::new(self.services.transcoder.as_ref(), &self.output_dir);
        let edit = effects
            .edit(&video, &audio, &script)
            .await
            .ok_or(JobError::Stage("Editing failed!"))?;
        files_to_clean.push(edit.output.clone());
        if !edit.premium {
            logw("Premium edit unavailable, uploaded cut is the simple merge");
        }
        self.report("✅ Edit ready", 90);
        self.stage_pause().await;

        self.report("📤 Uploading to YouTube...", 95);
        let title = format!("{} 🔥 PUBG Tips", topic);
        let url = self.services.publisher.publish(&edit.output, &title, &script).await;

        self.status.record_published(&url);
        let message = format!("✅ Video ready! {}", url);
        self.status
            .update(Update::working(&message).state(JobState::Success).progress(100));
        logok(format!("Published: {}", url));
        Ok(url)
    }

    async fn cleanup(&self, files: &[PathBuf]) {
        pause(self.pacing.settle()).await;
        for path in files {
            match fs::remove_file(path).await {
                Ok(()) => logi(format!("Removed {}", path.display())),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => logw(format!("Could not remove {}: {}", path.display(), err)),
            }
        }
        pause(self.pacing.idle()).await;
        self.status
            .update(Update::working("🤖 Bot waiting...").state(JobState::Idle).progress(0));
    }
}

async fn pause(duration: std::time::Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl JobRunner for Generator {
    async fn run(&self) {
        self.process_video().await;
    }
}
