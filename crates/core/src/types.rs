use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical Bilibili video code (BVID, or a b23.tv short-link code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VideoId(String);

impl VideoId {
    pub(crate) fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub cid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackSource {
    /// `x/player/v2`
    Primary,
    /// legacy `x/player.so`
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub language_code: String,
    pub language_label: String,
    pub download_url: String,
    pub source: TrackSource,
    pub is_ai_generated: bool,
}

impl SubtitleTrack {
    pub fn has_download_url(&self) -> bool {
        !self.download_url.trim().is_empty()
    }
}

/// Ordered, URL-deduplicated list of subtitle tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCatalog {
    tracks: Vec<SubtitleTrack>,
}

impl SubtitleCatalog {
    pub(crate) fn from_tracks(tracks: Vec<SubtitleTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[SubtitleTrack] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub from: f64,
    #[serde(default)]
    pub to: f64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segment_count: usize,
}

impl Transcript {
    pub fn from_segments(segments: &[Segment]) -> Self {
        let text = segments
            .iter()
            .map(|seg| seg.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            text,
            segment_count: segments.len(),
        }
    }

    /// Length in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub match_rate: f64,
    pub matched_keywords: Vec<String>,
    pub checked_keywords: usize,
    pub reason: Option<String>,
}

/// Successful result of one extraction request.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub bvid: VideoId,
    pub title: String,
    pub transcript: String,
    pub track_label: String,
    pub match_rate: f64,
    pub attempts: u32,
}
