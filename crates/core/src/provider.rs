use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Alibaba DashScope (Tongyi Qianwen)
    #[default]
    Qwen,
    /// Moonshot, OpenAI-compatible
    Kimi,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub default_model: &'static str,
    pub key_env_var: &'static str,
    pub model_env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Qwen => ProviderConfig {
                api_url: "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation",
                default_model: "qwen-plus",
                key_env_var: "QWEN_API_KEY",
                model_env_var: "QWEN_MODEL",
            },
            Provider::Kimi => ProviderConfig {
                api_url: "https://api.moonshot.cn/v1/chat/completions",
                default_model: "kimi-k2-0905-preview",
                key_env_var: "KIMI_API_KEY",
                model_env_var: "KIMI_MODEL",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Qwen => "Qwen",
            Provider::Kimi => "Kimi",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Provider::Qwen => "qwen",
            Provider::Kimi => "kimi",
        }
    }

    /// Lenient parse: anything that is not `kimi` selects Qwen.
    pub fn from_id_lossy(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qwen" => Ok(Provider::Qwen),
            "kimi" => Ok(Provider::Kimi),
            other => Err(format!("unknown provider '{other}' (expected qwen or kimi)")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
