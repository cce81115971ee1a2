use std::path::{Path, PathBuf};
use tokio::fs;

use crate::ffmpeg::Transcoder;
use crate::{file_larger_than, logi, logok, logw, loge, media_path, pick};

/// A stage output shorter than this is treated as a failed render.
const MIN_OUTPUT_BYTES: u64 = 1000;

pub const COLOR_GRADES: [&str; 7] = [
    // classic
    "eq=brightness=0.03:contrast=1.3:saturation=1.2,unsharp=3:3:0.5",
    // vibrant
    "eq=brightness=0.02:contrast=1.2:saturation=1.4,curves=vintage",
    // cinematic
    "colorbalance=rs=0.1:gs=0.05:bs=-0.1,eq=contrast=1.4:gamma=1.1",
    // action
    "eq=contrast=1.5:brightness=0.04:saturation=1.3,unsharp=5:5:1.0",
    // warm
    "colorbalance=rs=0.15:gs=0.05:bs=-0.05,eq=contrast=1.2",
    // cool
    "colorbalance=rs=-0.1:gs=0.05:bs=0.2,eq=contrast=1.3",
    // hdr
    "eq=contrast=1.4:brightness=0.05:saturation=1.2,curves=hdr",
];

const CAPTION_MAX_LINES: usize = 3;
const CAPTION_SINGLE_LINE_WORDS: usize = 8;
const CAPTION_BOTTOM_OFFSETS: [u32; CAPTION_MAX_LINES] = [270, 370, 470];

pub fn transition_filter(audio_duration: f64) -> String {
    let fade_out_start = (audio_duration - 1.5).max(0.0);
    format!("fade=t=in:st=0:d=1,fade=t=out:st={:.3}:d=1.5", fade_out_start)
}

/// Splits a script into at most three caption lines without dropping words.
pub fn caption_lines(script: &str) -> Vec<String> {
    let words: Vec<&str> = script.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= CAPTION_SINGLE_LINE_WORDS {
        return vec![words.join(" ")];
    }
    let per_line = words.len().div_ceil(CAPTION_MAX_LINES);
    words.chunks(per_line).map(|chunk| chunk.join(" ")).collect()
}

pub fn escape_drawtext(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for ch in line.chars() {
        match ch {
            '\'' => out.push('\u{2019}'),
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn caption_filter(script: &str) -> Option<String> {
    let lines = caption_lines(script);
    if lines.is_empty() {
        return None;
    }
    let filters: Vec<String> = lines
        .iter()
        .take(CAPTION_MAX_LINES)
        .zip(CAPTION_BOTTOM_OFFSETS)
        .map(|(line, offset)| {
            format!(
                "drawtext=text='{}':fontcolor=white:fontsize=45:borderw=3:bordercolor=black:x=(w-text_w)/2:y=h-text_h-{}:box=1:boxcolor=black@0.5:boxborderw=15",
                escape_drawtext(line),
                offset
            )
        })
        .collect();
    Some(filters.join(","))
}

fn pick_grade() -> &'static str {
    pick(&COLOR_GRADES).unwrap_or(COLOR_GRADES[0])
}

/// Result of the full effects chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub output: PathBuf,
    /// `false` when the premium chain failed and the single-step mux was used.
    pub premium: bool,
}

pub struct EffectsPipeline<'a> {
    transcoder: &'a dyn Transcoder,
    output_dir: &'a Path,
}

impl<'a> EffectsPipeline<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, output_dir: &'a Path) -> Self {
        Self { transcoder, output_dir }
    }

    /// Runs one filter stage. Returns the new file, or `input` unchanged when
    /// the transcoder is missing or the render fails.
    async fn filter_stage(&self, label: &str, prefix: &str, input: &Path, filter: &str, title: Option<&str>) -> PathBuf {
        if !self.transcoder.available() {
            return input.to_path_buf();
        }

        let out = media_path(self.output_dir, prefix, "mp4");
        match self.transcoder.filter_video(input, filter, title, &out).await {
            Ok(()) if file_larger_than(&out, MIN_OUTPUT_BYTES).await => {
                logok(format!("{} applied", label));
                out
            }
            Ok(()) => {
                logw(format!("{}: output missing after render", label));
                let _ = fs::remove_file(&out).await;
                input.to_path_buf()
            }
            Err(err) => {
                loge(format!("{} failed: {:#}", label, err));
                let _ = fs::remove_file(&out).await;
                input.to_path_buf()
            }
        }
    }

    pub async fn add_transitions(&self, video: &Path, audio_duration: f64) -> PathBuf {
        let filter = transition_filter(audio_duration);
        self.filter_stage("Transition", "transition", video, &filter, None).await
    }

    pub async fn add_color_grade(&self, video: &Path) -> PathBuf {
        let grade = pick_grade();
        logi(format!("Applying color grade: {}", grade));
        self.filter_stage("Color grade", "effect", video, grade, Some("PUBG Mobile Gameplay"))
            .await
    }

    pub async fn add_captions(&self, video: &Path, script: &str) -> PathBuf {
        match caption_filter(script) {
            Some(filter) => self.filter_stage("Captions", "text", video, &filter, None).await,
            None => video.to_path_buf(),
        }
    }

    /// Transition → color grade → captions → narration mux. Intermediates are
    /// removed before returning, whatever the outcome. `None` when the final
    /// mux fails or the transcoder is missing.
    pub async fn create_premium_video(&self, video: &Path, audio: &Path, script: &str) -> Option<PathBuf> {
        if !self.transcoder.available() {
            loge("ffmpeg missing, cannot edit");
            return None;
        }

        let audio_duration = match self.transcoder.probe_duration(audio).await {
            Ok(d) => d,
            Err(err) => {
                loge(format!("Premium edit failed: {:#}", err));
                return None;
            }
        };

        let mut intermediates = Vec::new();
        let mut current = video.to_path_buf();

        logi("Adding transitions...");
        let next = self.add_transitions(&current, audio_duration).await;
        if next != current {
            intermediates.push(next.clone());
            current = next;
        }

        logi("Adding color grade...");
        let next = self.add_color_grade(&current).await;
        if next != current {
            intermediates.push(next.clone());
            current = next;
        }

        logi("Adding captions...");
        let next = self.add_captions(&current, script).await;
        if next != current {
            intermediates.push(next.clone());
            current = next;
        }

        let out = media_path(self.output_dir, "premium", "mp4");
        let muxed = self.transcoder.mux_audio(&current, audio, &out).await;

        for path in &intermediates {
            let _ = fs::remove_file(path).await;
        }

        match muxed {
            Ok(()) if file_larger_than(&out, MIN_OUTPUT_BYTES).await => {
                logok(format!("Premium video ready: {}", out.display()));
                Some(out)
            }
            Ok(()) => {
                loge("Premium video was not created");
                let _ = fs::remove_file(&out).await;
                None
            }
            Err(err) => {
                loge(format!("Premium mux failed: {:#}", err));
                let _ = fs::remove_file(&out).await;
                None
            }
        }
    }

    pub async fn simple_merge(&self, video: &Path, audio: &Path) -> Option<PathBuf> {
        if !self.transcoder.available() {
            return None;
        }
        let out = media_path(self.output_dir, "simple", "mp4");
        if let Err(err) = self.transcoder.simple_mux(video, audio, &out).await {
            loge(format!("Simple merge failed: {:#}", err));
        }
        if fs::metadata(&out).await.is_ok() {
            Some(out)
        } else {
            None
        }
    }

    /// Premium chain, falling back to the single-step mux.
    pub async fn edit(&self, video: &Path, audio: &Path, script: &str) -> Option<Edit> {
        if let Some(output) = self.create_premium_video(video, audio, script).await {
            return Some(Edit { output, premium: true });
        }
        logw("Premium edit failed, using simple merge");
        self.simple_merge(video, audio)
            .await
            .map(|output| Edit { output, premium: false })
    }
}
