use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::{
    error::ConfigError,
    extract::{ExtractorConfig, RetryPolicy, UpstreamConfig},
    provider::Provider,
    validation::ValidationThresholds,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// User settings, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: Provider,
    pub qwen: ProviderSettings,
    pub kimi: ProviderSettings,
    /// Bilibili session cookie; AI subtitles are only listed for logged-in sessions.
    pub bilibili_cookie: Option<String>,
    pub system_prompt: Option<String>,
    /// Prompt with `{title}` and `{subtitle}` placeholders.
    pub prompt_template: Option<String>,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub validation: ValidationThresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            qwen: ProviderSettings::default(),
            kimi: ProviderSettings::default(),
            bilibili_cookie: None,
            system_prompt: None,
            prompt_template: None,
            max_tokens: 8000,
            request_timeout_secs: 10,
            validation: ValidationThresholds::default(),
        }
    }
}

/// A partial change to [`Settings`].
///
/// The cookie is replaced whenever it is given. Provider, key and model are
/// only touched when an API key is given.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub provider: Option<Provider>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub bilibili_cookie: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Settings {
    pub fn provider_settings(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::Qwen => &self.qwen,
            Provider::Kimi => &self.kimi,
        }
    }

    fn provider_settings_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::Qwen => &mut self.qwen,
            Provider::Kimi => &mut self.kimi,
        }
    }

    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        self.provider_settings(provider)
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn model(&self, provider: Provider) -> &str {
        self.provider_settings(provider)
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(provider.config().default_model)
    }

    /// Overlay values from the environment (`QWEN_API_KEY`, `BILIBILI_COOKIE`, ...).
    ///
    /// `lookup` is normally `|k| std::env::var(k).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = non_empty(lookup("AI_PROVIDER")) {
            self.provider = Provider::from_id_lossy(&provider);
        }

        for provider in [Provider::Qwen, Provider::Kimi] {
            let config = provider.config();
            let key = non_empty(lookup(config.key_env_var));
            let model = non_empty(lookup(config.model_env_var));
            let settings = self.provider_settings_mut(provider);
            if key.is_some() {
                settings.api_key = key;
            }
            if model.is_some() {
                settings.model = model;
            }
        }

        if let Some(cookie) = non_empty(lookup("BILIBILI_COOKIE")) {
            self.bilibili_cookie = Some(cookie);
        }
        if let Some(prompt) = non_empty(lookup("SYSTEM_PROMPT")) {
            self.system_prompt = Some(prompt);
        }
        if let Some(template) = non_empty(lookup("PROMPT_TEMPLATE")) {
            self.prompt_template = Some(template);
        }
        if let Some(raw) = non_empty(lookup("QWEN_MAX_TOKENS")) {
            self.max_tokens = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "QWEN_MAX_TOKENS",
                value: raw.clone(),
            })?;
        }

        Ok(())
    }

    pub fn apply_update(&mut self, update: ConfigUpdate) {
        if let Some(cookie) = update.bilibili_cookie {
            self.bilibili_cookie = non_empty(Some(cookie));
        }

        let Some(api_key) = non_empty(update.api_key) else {
            return;
        };

        let provider = update.provider.unwrap_or(self.provider);
        self.provider = provider;
        let settings = self.provider_settings_mut(provider);
        settings.api_key = Some(api_key);
        if let Some(model) = non_empty(update.model) {
            settings.model = Some(model);
        }
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            upstream: UpstreamConfig {
                cookie: self.bilibili_cookie.clone(),
                timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
                ..UpstreamConfig::default()
            },
            retry: RetryPolicy::default(),
            thresholds: self.validation.clone(),
        }
    }

    /// Copy safe to print: secrets reduced to a short preview.
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        for settings in [&mut copy.qwen, &mut copy.kimi] {
            settings.api_key = settings.api_key.as_deref().map(mask_secret);
        }
        copy.bilibili_cookie = copy.bilibili_cookie.as_deref().map(mask_secret);
        copy
    }
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}**** ({} chars)", secret.chars().count())
    }
}

/// Reads and writes [`Settings`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/bilinote/config.toml`
    pub fn default_location() -> Result<Self, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(dir.join("bilinote").join("config.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means default settings.
    pub async fn load(&self) -> Result<Settings, ConfigError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        settings.validation.check()?;
        Ok(settings)
    }

    /// Stored settings with environment overrides applied.
    pub async fn load_with_env(&self) -> Result<Settings, ConfigError> {
        let mut settings = self.load().await?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub async fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let content = toml::to_string_pretty(settings)?;
        fs::write(&self.path, content).await.map_err(io_err)?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    pub async fn update(&self, update: ConfigUpdate) -> Result<Settings, ConfigError> {
        let mut settings = self.load().await?;
        settings.apply_update(update);
        self.save(&settings).await?;
        Ok(settings)
    }
}
