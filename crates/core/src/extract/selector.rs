use url::Url;

use crate::{
    error::ExtractError,
    types::{SubtitleCatalog, SubtitleTrack},
};

/// Which rule picked the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    AiGenerated,
    Chinese,
    FirstListed,
}

pub fn is_ai_track(track: &SubtitleTrack) -> bool {
    track.language_code == "ai-zh" || track.language_label.contains("AI") || track.is_ai_generated
}

pub fn is_chinese_track(track: &SubtitleTrack) -> bool {
    matches!(track.language_code.as_str(), "zh-CN" | "zh-Hans")
        || track.language_label.contains('中')
}

/// AI track first, then a Chinese one, then whatever is listed first.
pub fn select_track(catalog: &SubtitleCatalog) -> Option<(&SubtitleTrack, SelectionRule)> {
    let tracks = catalog.tracks();

    tracks
        .iter()
        .find(|t| is_ai_track(t))
        .map(|t| (t, SelectionRule::AiGenerated))
        .or_else(|| {
            tracks
                .iter()
                .find(|t| is_chinese_track(t))
                .map(|t| (t, SelectionRule::Chinese))
        })
        .or_else(|| tracks.first().map(|t| (t, SelectionRule::FirstListed)))
}

/// Reject tracks whose URL is empty or neither absolute nor protocol-relative.
pub fn ensure_usable_url(track: &SubtitleTrack) -> Result<(), ExtractError> {
    let url = track.download_url.trim();

    if url.is_empty() {
        return Err(ExtractError::InvalidTrackUrl {
            label: track.language_label.clone(),
        });
    }

    let well_formed = if let Some(rest) = url.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).is_ok_and(|u| u.host().is_some())
    } else {
        url.contains("://") && Url::parse(url).is_ok()
    };

    if well_formed {
        Ok(())
    } else {
        Err(ExtractError::MalformedTrackUrl {
            label: track.language_label.clone(),
            url: url.to_string(),
        })
    }
}
