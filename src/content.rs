use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::groq::GroqClient;
use crate::api::{Completion, TextGenerator};
use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::{logi, logw, pick, truncate_chars};

pub const TOPIC_ATTEMPTS: usize = 5;
pub const HISTORY_MAX: usize = 100;

const TOPIC_MIN_CHARS: usize = 8;
const TOPIC_MAX_CHARS: usize = 100;
const SCRIPT_MIN_CHARS: usize = 20;

pub const TOPIC_TEMPLATES: [&str; 10] = [
    "How to {} in PUBG Mobile",
    "Best {} tips for beginners",
    "Secret {} strategy revealed",
    "Pro {} guide 2026",
    "Top 3 {} mistakes to avoid",
    "Master {} like a pro",
    "Ultimate {} tutorial",
    "5 unknown {} tips",
    "Complete {} guide",
    "Insane {} tricks",
];

pub const CONTENT_TYPES: [&str; 37] = [
    "improve your aim",
    "landing spots",
    "weapon attachments",
    "sensitivity settings",
    "close combat",
    "sniper shots",
    "vehicle driving",
    "grenade throws",
    "loot locations",
    "rotation strategies",
    "camping spots",
    "aggressive gameplay",
    "passive gameplay",
    "squad coordination",
    "solo vs squad",
    "recoil control",
    "headshots",
    "movement techniques",
    "peeking tactics",
    "M416",
    "AKM",
    "SCAR-L",
    "UZI",
    "Vector",
    "SKS",
    "Kar98k",
    "AWM",
    "Erangel map",
    "Miramar desert",
    "Sanhok jungle",
    "Vikendi snow",
    "Livik island",
    "compensator usage",
    "suppressor tips",
    "extended mag",
    "vertical grip",
    "thumb grip benefits",
];

const TOPIC_SUFFIXES: [&str; 6] = ["", " in 2026", " pro tips", " complete guide", " for beginners", " advanced"];

const TOPIC_SYSTEM_PROMPT: &str = "You are a PUBG expert. Generate unique, specific video topics.";

const TOPIC_PROMPTS: [&str; 3] = [
    "Generate ONE unique PUBG Mobile tips video topic. Return ONLY the topic, nothing else. Be creative and specific.",
    "Create ONE original PUBG gameplay tutorial topic. Return ONLY topic name. Make it interesting.",
    "Invent ONE catchy PUBG tips title. Return ONLY title, no explanation. Focus on specific weapons or maps.",
];

const SCRIPT_STYLES: [&str; 6] = ["energetic", "professional", "funny", "dramatic", "casual", "exciting"];

fn whitespace_regex() -> Result<&'static Regex> {
    static WHITESPACE_RE: OnceCell<Regex> = OnceCell::new();
    WHITESPACE_RE.get_or_try_init(|| Regex::new(r"\s+").context("Failed to compile whitespace regex"))
}

/// Collapses whitespace runs and strips wrapping quotes the model tends to add.
pub fn clean_generated(raw: &str) -> String {
    let trimmed = raw.trim();
    let collapsed = match whitespace_regex() {
        Ok(re) => re.replace_all(trimmed, " ").into_owned(),
        Err(_) => trimmed.to_string(),
    };
    collapsed
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

pub fn template_topic() -> String {
    let template = pick(&TOPIC_TEMPLATES).unwrap_or(TOPIC_TEMPLATES[0]);
    let content = pick(&CONTENT_TYPES).unwrap_or(CONTENT_TYPES[0]);
    let suffix = pick(&TOPIC_SUFFIXES).unwrap_or("");
    format!("{}{}", template.replacen("{}", content, 1), suffix)
}

pub fn template_script(topic: &str) -> String {
    let templates = [
        format!("Hey guys! Want to master {}? Here's the secret technique pros use! Watch till the end and subscribe!", topic),
        format!("This {} trick will change your game forever! Pro players don't want you to know this!", topic),
        format!("Stop losing in PUBG! Learn {} right now and start winning every game!", topic),
        format!("Insane {} tips revealed! This works every single time in PUBG Mobile!", topic),
        format!("Today I'll show you {}. This technique works 100% of the time!", topic),
        format!("Never seen before {} strategy! You won't believe how easy it is!", topic),
    ];
    pick(&templates).unwrap_or_else(|| templates[0].clone())
}

fn numbered_topic() -> String {
    format!("PUBG Mobile Pro Tips #{}", rand::random::<u16>() % 900 + 100)
}

/// Topic and script writer. Owns the recent-topics history.
pub struct ContentWriter {
    generator: Option<Arc<dyn TextGenerator>>,
    history: Mutex<VecDeque<String>>,
}

impl ContentWriter {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            generator,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_MAX)),
        }
    }

    /// Uses Groq when an API key is configured, templates otherwise.
    pub fn from_config(cfg: &Config, client: reqwest::Client) -> Self {
        let generator = cfg.groq_api_key.as_ref().map(|key| {
            Arc::new(GroqClient::new(client, key.clone(), cfg.groq_model.clone())) as Arc<dyn TextGenerator>
        });
        Self::new(generator)
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records `topic` unless already present. Returns whether it was new.
    fn remember(&self, topic: &str) -> bool {
        let mut history = self.history();
        if history.iter().any(|t| t == topic) {
            return false;
        }
        history.push_back(topic.to_string());
        while history.len() > HISTORY_MAX {
            history.pop_front();
        }
        true
    }

    pub fn recent_topics(&self) -> Vec<String> {
        self.history().iter().cloned().collect()
    }

    async fn generated_topic(&self, attempt: usize) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let prompt = pick(&TOPIC_PROMPTS).unwrap_or(TOPIC_PROMPTS[0]);
        let request = Completion {
            system: TOPIC_SYSTEM_PROMPT,
            user: prompt,
            temperature: 1.0,
            max_tokens: 50,
        };
        match generator.complete(request).await {
            Ok(raw) => {
                let topic = clean_generated(&raw);
                let len = topic.chars().count();
                if (TOPIC_MIN_CHARS..=TOPIC_MAX_CHARS).contains(&len) {
                    Some(topic)
                } else {
                    None
                }
            }
            Err(err) => {
                logw(format!("Topic generation failed (attempt {}): {:#}", attempt + 1, err));
                None
            }
        }
    }

    /// A topic not among the last hundred returned. Falls back to templates,
    /// then to a numbered topic.
    pub async fn generate_unique_topic(&self) -> String {
        RetryPolicy::new(TOPIC_ATTEMPTS)
            .run_or_else(
                "Topic generation",
                |attempt| async move {
                    let topic = match self.generated_topic(attempt).await {
                        Some(topic) => topic,
                        None => template_topic(),
                    };
                    if self.remember(&topic) {
                        logi(format!("Topic: {}", topic));
                        Ok(Some(topic))
                    } else {
                        Ok(None)
                    }
                },
                move || async move {
                    // 900 numbers against a 100-entry history: a free one
                    // always exists.
                    loop {
                        let topic = numbered_topic();
                        if self.remember(&topic) {
                            logw(format!("Using numbered topic {}", topic));
                            return topic;
                        }
                    }
                },
            )
            .await
    }

    pub async fn generate_unique_script(&self, topic: &str) -> String {
        if let Some(generator) = self.generator.as_ref() {
            let style = pick(&SCRIPT_STYLES).unwrap_or(SCRIPT_STYLES[0]);
            let system = format!(
                "You are a professional PUBG YouTuber. Write a {} 15-second video script about the topic. Make it engaging and call to action. Maximum 30 words.",
                style
            );
            let user = format!("Write a script about: {}", topic);
            let request = Completion {
                system: &system,
                user: &user,
                temperature: 0.9,
                max_tokens: 100,
            };
            match generator.complete(request).await {
                Ok(raw) => {
                    let script = clean_generated(&raw);
                    if script.chars().count() > SCRIPT_MIN_CHARS {
                        logi(format!("Script: {}...", truncate_chars(&script, 50)));
                        return script;
                    }
                    logw("Generated script too short, using template");
                }
                Err(err) => logw(format!("Script generation failed: {:#}", err)),
            }
        }
        template_script(topic)
    }
}
