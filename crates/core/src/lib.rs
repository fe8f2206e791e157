//! Bilibili subtitle extraction with relevance validation, and study notes built on top.

pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod notes;
pub mod provider;
pub mod types;
pub mod validation;

pub use config::{ConfigStore, ConfigUpdate, ProviderSettings, Settings};
pub use error::{BilinoteError, ConfigError, ExtractError, NoteError, Result};
pub use extract::{
    BilibiliApi, CrossCheck, Diagnosis, Extractor, ExtractorConfig, HttpBilibiliApi,
    ListingIssue, RetryPolicy, TrackReport, UpstreamConfig, cross_check, extract_bvid,
};
pub use format::{format_diagnosis, format_extraction_summary, format_fallback_note};
pub use notes::{Note, NoteGenerator, NoteOrigin, NoteSettings};
pub use provider::{Provider, ProviderConfig};
pub use types::{
    Extraction, Segment, SubtitleCatalog, SubtitleTrack, TrackSource, Transcript,
    ValidationOutcome, VideoId, VideoMetadata,
};
pub use validation::{ValidationThresholds, validate};
