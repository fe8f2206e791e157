use std::path::PathBuf;

use thiserror::Error;

/// Failures of the subtitle extraction pipeline.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid Bilibili video URL: {input}")]
    InvalidUrl { input: String },

    #[error("{endpoint} rejected the request (code {code}): {message}")]
    UpstreamRejected {
        endpoint: &'static str,
        code: i64,
        message: String,
    },

    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Video {bvid} has no content id (cid)")]
    MissingContentId { bvid: String },

    #[error("This video has no subtitles available")]
    NoSubtitlesAvailable,

    #[error("Selected subtitle track \"{label}\" has an empty download URL")]
    InvalidTrackUrl { label: String },

    #[error("Selected subtitle track \"{label}\" has a malformed download URL: {url}")]
    MalformedTrackUrl { label: String, url: String },

    #[error("Malformed subtitle data: {0}")]
    MalformedSubtitleData(String),

    #[error("Subtitle body is empty")]
    EmptySubtitle,

    #[error(
        "Subtitle URL is invalid after {attempts} attempts; a login cookie may be required or the video has no usable subtitles. Selected track: {label}"
    )]
    SubtitleUrlInvalid { label: String, attempts: u32 },

    #[error(
        "Subtitle content validation failed: {reason}. Match rate for \"{title}\" was only {:.1}% after {attempts} attempts",
        .match_rate * 100.0
    )]
    ValidationExhausted {
        title: String,
        match_rate: f64,
        reason: String,
        attempts: u32,
    },

    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Errors on which the orchestrator re-runs the whole pipeline.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractError::InvalidTrackUrl { .. }
                | ExtractError::MalformedTrackUrl { .. }
                | ExtractError::MalformedSubtitleData(_)
                | ExtractError::EmptySubtitle
        )
    }

    pub fn is_track_url_error(&self) -> bool {
        matches!(
            self,
            ExtractError::InvalidTrackUrl { .. } | ExtractError::MalformedTrackUrl { .. }
        )
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(err: reqwest::Error) -> Self {
        ExtractError::Network(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Missing API key for {provider_name}: set {env_var} or run `bilinote config set`")]
    MissingApiKey {
        provider_name: String,
        env_var: String,
    },

    #[error("{provider_name} API request failed ({status}): {message}")]
    Api {
        provider_name: String,
        status: u16,
        message: String,
    },

    #[error("{provider_name} returned an unexpected response: {reason}")]
    InvalidResponse {
        provider_name: String,
        reason: String,
    },

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine a configuration directory")]
    NoConfigDir,

    #[error("Failed to access config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum BilinoteError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Note(#[from] NoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BilinoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(
            ExtractError::InvalidTrackUrl {
                label: "中文".into()
            }
            .is_retryable()
        );
        assert!(ExtractError::EmptySubtitle.is_retryable());
        assert!(ExtractError::MalformedSubtitleData("no body".into()).is_retryable());
        assert!(!ExtractError::Network("timeout".into()).is_retryable());
        assert!(!ExtractError::NoSubtitlesAvailable.is_retryable());
        assert!(
            !ExtractError::UpstreamRejected {
                endpoint: "view",
                code: -404,
                message: "啥都木有".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn exhausted_message_carries_rate_and_reason() {
        let err = ExtractError::ValidationExhausted {
            title: "费曼的学习心智模型".into(),
            match_rate: 0.05,
            reason: "keyword match rate too low (5.0% < 15%)".into(),
            attempts: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("5.0%"));
        assert!(msg.contains("keyword match rate too low"));
        assert!(msg.contains("费曼的学习心智模型"));
    }
}
