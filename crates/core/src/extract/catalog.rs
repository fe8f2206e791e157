use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Deserializer, de::IgnoredAny};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::ExtractError,
    extract::upstream::{BilibiliApi, unwrap_envelope},
    types::{SubtitleCatalog, SubtitleTrack, TrackSource, VideoId},
};

static SUBTITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<subtitle>(.*?)</subtitle>").expect("valid regex"));

/// Subtitle item as both listing endpoints return it.
#[derive(Debug, Default, Deserialize)]
struct RawSubtitleInfo {
    #[serde(default)]
    lan: String,
    #[serde(default)]
    lan_doc: String,
    #[serde(default)]
    subtitle_url: String,
    #[serde(default, deserialize_with = "key_present")]
    ai_status: bool,
    #[serde(default, deserialize_with = "key_present")]
    ai_type: bool,
}

/// True whenever the key exists, even with a `null` value.
fn key_present<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(true)
}

impl RawSubtitleInfo {
    fn into_track(self, source: TrackSource) -> SubtitleTrack {
        let is_ai_generated = self.ai_status || self.ai_type;
        SubtitleTrack {
            language_code: self.lan,
            language_label: self.lan_doc,
            download_url: self.subtitle_url,
            source,
            is_ai_generated,
        }
    }
}

/// What `x/player/v2` lists: regular tracks plus an optional AI track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryListing {
    pub tracks: Vec<SubtitleTrack>,
    pub ai_track: Option<SubtitleTrack>,
}

impl PrimaryListing {
    /// Usable primary tracks with the AI track appended unless its URL is already listed.
    pub fn usable_tracks(self) -> Vec<SubtitleTrack> {
        let mut tracks: Vec<SubtitleTrack> = self
            .tracks
            .into_iter()
            .filter(SubtitleTrack::has_download_url)
            .collect();

        if let Some(ai) = self.ai_track.filter(SubtitleTrack::has_download_url) {
            if !tracks.iter().any(|t| t.download_url == ai.download_url) {
                tracks.push(ai);
            }
        }

        tracks
    }
}

fn parse_subtitle_list(list: &Value, source: TrackSource) -> Vec<SubtitleTrack> {
    let Some(items) = list.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match RawSubtitleInfo::deserialize(item) {
            Ok(raw) => Some(raw.into_track(source)),
            Err(e) => {
                debug!("skipping unreadable subtitle entry: {e}");
                None
            }
        })
        .collect()
}

pub fn parse_player_v2(body: &Value) -> Result<PrimaryListing, ExtractError> {
    let data = unwrap_envelope("player/v2", body)?;
    let subtitle = &data["subtitle"];

    let tracks = parse_subtitle_list(&subtitle["subtitles"], TrackSource::Primary);

    let ai_track = match RawSubtitleInfo::deserialize(&subtitle["ai_subtitle"]) {
        Ok(raw) if !raw.subtitle_url.is_empty() => Some(SubtitleTrack {
            language_code: if raw.lan.is_empty() {
                "ai-zh".to_string()
            } else {
                raw.lan
            },
            language_label: if raw.lan_doc.is_empty() {
                "AI生成字幕".to_string()
            } else {
                raw.lan_doc
            },
            download_url: raw.subtitle_url,
            source: TrackSource::Primary,
            is_ai_generated: true,
        }),
        _ => None,
    };

    Ok(PrimaryListing { tracks, ai_track })
}

/// Pull the JSON blob out of the `<subtitle>` element of a `player.so` reply.
pub fn parse_player_so(xml: &str) -> Result<Vec<SubtitleTrack>, ExtractError> {
    let Some(caps) = SUBTITLE_TAG.captures(xml) else {
        return Ok(Vec::new());
    };

    let blob = caps[1].trim();
    if blob.is_empty() {
        return Ok(Vec::new());
    }

    let json: Value = serde_json::from_str(blob).map_err(|e| {
        ExtractError::MalformedSubtitleData(format!("player.so subtitle blob is not JSON: {e}"))
    })?;

    Ok(parse_subtitle_list(&json["subtitles"], TrackSource::Secondary))
}

/// Merge both listings into one catalog.
///
/// Tracks without a download URL are dropped. On a URL collision the first
/// occurrence is kept, so primary tracks always win over secondary ones.
pub fn merge_tracks(primary: Vec<SubtitleTrack>, secondary: Vec<SubtitleTrack>) -> SubtitleCatalog {
    let mut seen = HashSet::new();
    let tracks = primary
        .into_iter()
        .chain(secondary)
        .filter(|t| t.has_download_url())
        .filter(|t| seen.insert(t.download_url.clone()))
        .collect();

    SubtitleCatalog::from_tracks(tracks)
}

/// Query `player/v2`, falling back to `player.so` when it lists nothing usable.
pub async fn fetch_catalog(
    api: &dyn BilibiliApi,
    bvid: &VideoId,
    cid: u64,
) -> Result<SubtitleCatalog, ExtractError> {
    let listing = api.player_v2(bvid, cid).await?;
    let listed = listing.tracks.len();
    let primary = listing.usable_tracks();
    debug!(listed, usable = primary.len(), "primary subtitle listing");

    if !primary.is_empty() {
        return Ok(merge_tracks(primary, Vec::new()));
    }

    let secondary = match api.player_so(bvid, cid).await {
        Ok(tracks) => {
            debug!(found = tracks.len(), "secondary subtitle listing");
            tracks
        }
        Err(e) => {
            warn!("player.so lookup failed, continuing without it: {e}");
            Vec::new()
        }
    };

    Ok(merge_tracks(primary, secondary))
}
