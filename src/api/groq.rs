use super::{Completion, TextGenerator};
use crate::logw;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

pub(crate) fn extract_message_content(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("Groq error message: {}", msg));
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            logw(format!("Groq error code: {}", code));
        }
        return None;
    }

    root.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.trim().to_string())
}

#[async_trait]
impl TextGenerator for GroqClient {
    async fn complete(&self, request: Completion<'_>) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let resp = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("Groq request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let snippet = raw.chars().take(400).collect::<String>();
            anyhow::bail!("Groq HTTP {}: {}", status.as_u16(), snippet);
        }

        extract_message_content(&raw).context("Groq response parse failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"  Sniper tips on Erangel \n"}}]}"#;
        assert_eq!(extract_message_content(raw).as_deref(), Some("Sniper tips on Erangel"));
    }

    #[test]
    fn error_body_yields_none() {
        let raw = r#"{"error":{"message":"model decommissioned","code":"model_decommissioned"}}"#;
        assert!(extract_message_content(raw).is_none());
    }

    #[test]
    fn empty_choices_yield_none() {
        assert!(extract_message_content(r#"{"choices":[]}"#).is_none());
        assert!(extract_message_content("not json").is_none());
    }
}
