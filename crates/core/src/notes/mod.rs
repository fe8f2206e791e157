//! Study-note generation from a validated transcript.

pub mod llm;
pub mod prompt;

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::Settings, error::NoteError, format::format_fallback_note, provider::Provider,
};

pub use prompt::{ChatMessage, DEFAULT_PROMPT_TEMPLATE, build_messages, render_prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteOrigin {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub markdown: String,
    pub origin: NoteOrigin,
}

impl Note {
    pub fn fallback(title: &str, transcript: &str) -> Self {
        Self {
            markdown: format_fallback_note(title, transcript),
            origin: NoteOrigin::Fallback,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NoteSettings {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt_template: Option<String>,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl NoteSettings {
    /// Note settings for `provider`, or the configured one.
    pub fn from_settings(settings: &Settings, provider: Option<Provider>) -> Self {
        let provider = provider.unwrap_or(settings.provider);
        Self {
            provider,
            api_key: settings.api_key(provider).map(str::to_string),
            model: settings.model(provider).to_string(),
            system_prompt: settings.system_prompt.clone(),
            prompt_template: settings.prompt_template.clone(),
            max_tokens: settings.max_tokens,
            timeout: Duration::from_secs(180),
        }
    }
}

pub struct NoteGenerator {
    client: reqwest::Client,
    settings: NoteSettings,
    api_url: String,
}

impl NoteGenerator {
    pub fn new(settings: NoteSettings) -> Result<Self, NoteError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        let api_url = settings.provider.config().api_url.to_string();

        Ok(Self {
            client,
            settings,
            api_url,
        })
    }

    /// Point at another endpoint speaking the same protocol.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn provider(&self) -> Provider {
        self.settings.provider
    }

    fn api_key(&self) -> Result<&str, NoteError> {
        self.settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                let provider = self.settings.provider;
                NoteError::MissingApiKey {
                    provider_name: provider.name().to_string(),
                    env_var: provider.config().key_env_var.to_string(),
                }
            })
    }

    pub async fn generate(&self, title: &str, transcript: &str) -> Result<String, NoteError> {
        let api_key = self.api_key()?;
        let provider = self.settings.provider;

        let prompt = render_prompt(self.settings.prompt_template.as_deref(), title, transcript);
        let messages = build_messages(self.settings.system_prompt.as_deref(), prompt);
        let body = llm::request_body(
            provider,
            &self.settings.model,
            &messages,
            self.settings.max_tokens,
        );

        info!(
            provider = provider.name(),
            model = %self.settings.model,
            transcript_chars = transcript.chars().count(),
            "requesting study note"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let json = serde_json::from_str::<serde_json::Value>(&text);

        if !status.is_success() {
            let message = json
                .as_ref()
                .ok()
                .and_then(llm::error_message)
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(NoteError::Api {
                provider_name: provider.name().to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let json = json.map_err(|e| NoteError::InvalidResponse {
            provider_name: provider.name().to_string(),
            reason: format!("body is not JSON ({e})"),
        })?;
        let content = llm::parse_reply(provider, &json)?;
        info!(chars = content.chars().count(), "study note generated");
        Ok(content)
    }

    /// AI note when possible, otherwise the deterministic fallback.
    pub async fn generate_or_fallback(&self, title: &str, transcript: &str) -> Note {
        match self.generate(title, transcript).await {
            Ok(markdown) => Note {
                markdown,
                origin: NoteOrigin::Ai,
            },
            Err(e) => {
                warn!("AI note generation failed, using plain note: {e}");
                Note::fallback(title, transcript)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_key: Option<&str>) -> NoteSettings {
        NoteSettings {
            provider: Provider::Kimi,
            api_key: api_key.map(str::to_string),
            model: "kimi-k2-0905-preview".into(),
            system_prompt: None,
            prompt_template: None,
            max_tokens: 8000,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn missing_key_is_reported_before_any_request() {
        let generator = NoteGenerator::new(settings(None)).unwrap();
        let err = generator.generate("t", "s").await.unwrap_err();

        match err {
            NoteError::MissingApiKey { env_var, .. } => assert_eq!(env_var, "KIMI_API_KEY"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn failure_falls_back_to_plain_note() {
        let generator = NoteGenerator::new(settings(Some("  "))).unwrap();
        let note = generator.generate_or_fallback("费曼学习法", "字幕").await;

        assert_eq!(note.origin, NoteOrigin::Fallback);
        assert!(note.markdown.starts_with("# 费曼学习法"));
    }

    #[test]
    fn settings_follow_requested_provider() {
        let mut config = Settings::default();
        config.kimi.api_key = Some("sk-kimi".into());

        let qwen = NoteSettings::from_settings(&config, None);
        assert_eq!(qwen.provider, Provider::Qwen);
        assert_eq!(qwen.api_key, None);
        assert_eq!(qwen.model, "qwen-plus");

        let kimi = NoteSettings::from_settings(&config, Some(Provider::Kimi));
        assert_eq!(kimi.api_key.as_deref(), Some("sk-kimi"));
        assert_eq!(kimi.max_tokens, 8000);
    }
}
