mod common;

use common::{ProgressLog, STUB_URL, files_in, stubs, test_config};
use gameplay_shorts::content::ContentWriter;
use gameplay_shorts::effects::EffectsPipeline;
use gameplay_shorts::ffmpeg::{Ffmpeg, Transcoder};
use gameplay_shorts::footage::{FootageAcquirer, PLACEHOLDER_SECONDS};
use gameplay_shorts::generator::{Generator, Services};
use gameplay_shorts::narration::Narrator;
use gameplay_shorts::status::{JobState, SharedStatus};
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn successful_job_publishes_and_cleans_up() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path());
    let status = SharedStatus::new();
    let progress = ProgressLog::watching(&status);
    let set = stubs(&progress, true, true);

    let generator = Generator::new(&cfg, set.services, Arc::new(ContentWriter::new(None)), status.clone());
    let url = generator.process_video().await;

    assert_eq!(url.as_deref(), Some(STUB_URL));
    let snap = status.snapshot();
    assert_eq!(snap.total_videos, 1);
    assert_eq!(snap.last_video_url.as_deref(), Some(STUB_URL));
    assert!(snap.last_run.is_some());
    assert_eq!(snap.status, JobState::Idle);
    assert_eq!(snap.progress, 0);
    assert_eq!(snap.topics_generated, 1);
    assert!(!snap.current_topic.is_empty());
    assert!(snap.errors.is_empty());
    assert!(snap.logs.iter().any(|l| l.contains("Video ready!")));

    let uploaded = set.publisher.uploaded.lock().unwrap().clone();
    assert_eq!(uploaded.len(), 1);
    assert!(uploaded[0].1.starts_with(&snap.current_topic));
    assert!(uploaded[0].1.ends_with("🔥 PUBG Tips"));

    assert!(files_in(&cfg.output_dir).is_empty(), "leftover files: {:?}", files_in(&cfg.output_dir));
}

#[tokio::test]
async fn progress_never_goes_backwards_within_a_job() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path());
    let status = SharedStatus::new();
    let progress = ProgressLog::watching(&status);
    let set = stubs(&progress, false, true);

    let generator = Generator::new(&cfg, set.services, Arc::new(ContentWriter::new(None)), status.clone());
    assert_eq!(generator.process_video().await.as_deref(), Some(STUB_URL));

    let values = progress.values();
    assert!(!values.is_empty());
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", values);
    // search failed, so the placeholder clip was rendered at 55
    assert!(values.contains(&55));
    assert_eq!(values.last(), Some(&95));
    assert!(files_in(&cfg.output_dir).is_empty());
}

#[tokio::test]
async fn missing_transcoder_ends_in_error_without_panicking() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path());
    let status = SharedStatus::new();
    let progress = ProgressLog::watching(&status);
    let set = stubs(&progress, false, false);

    let generator = Generator::new(&cfg, set.services, Arc::new(ContentWriter::new(None)), status.clone());
    assert!(generator.process_video().await.is_none());

    let snap = status.snapshot();
    assert_eq!(snap.total_videos, 0);
    assert!(snap.last_video_url.is_none());
    assert_eq!(snap.status, JobState::Idle);
    assert_eq!(snap.progress, 0);
    assert_eq!(snap.errors.len(), 1);
    assert!(snap.errors[0].contains("No video available"));
    assert!(set.publisher.uploaded.lock().unwrap().is_empty());
    assert!(files_in(&cfg.output_dir).is_empty());
}

#[tokio::test]
async fn edit_failure_with_real_footage_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path());
    let status = SharedStatus::new();
    let set = stubs(&ProgressLog::default(), true, false);

    let generator = Generator::new(&cfg, set.services, Arc::new(ContentWriter::new(None)), status.clone());
    assert!(generator.process_video().await.is_none());

    let snap = status.snapshot();
    assert!(snap.errors[0].contains("Editing failed"));
    assert!(files_in(&cfg.output_dir).is_empty());
}

#[tokio::test]
async fn real_ffmpeg_absent_degrades_every_stage() {
    let dir = tempdir().unwrap();
    let out = dir.path();
    let ffmpeg = Ffmpeg::detect("no-such-ffmpeg-binary", "no-such-ffprobe-binary").await;
    assert!(!ffmpeg.available());

    let set = stubs(&ProgressLog::default(), true, false);
    let Services { speech, footage, .. } = set.services;

    let narrator = Narrator::new(speech.as_ref(), &ffmpeg, out);
    assert!(narrator.create_silent_audio().await.is_none());

    let acquirer = FootageAcquirer::new(footage.as_ref(), &ffmpeg, out, "pubg");
    assert!(acquirer.create_fallback_video(PLACEHOLDER_SECONDS).await.is_none());

    let input = out.join("clip.mp4");
    std::fs::write(&input, vec![0u8; 2048]).unwrap();
    let effects = EffectsPipeline::new(&ffmpeg, out);
    assert_eq!(effects.add_transitions(&input, 15.0).await, input);
    assert_eq!(effects.add_color_grade(&input).await, input);
    assert_eq!(effects.add_captions(&input, "Spray transfer like a pro").await, input);
    assert!(effects.edit(&input, &input, "script").await.is_none());
}
