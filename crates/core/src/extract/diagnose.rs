//! Per-video troubleshooting: both listings side by side and every track scored.

use std::{collections::HashSet, fmt};

use tracing::{debug, info, warn};

use crate::{
    error::ExtractError,
    extract::{
        bvid::extract_bvid,
        catalog::merge_tracks,
        download::download_transcript,
        selector::{SelectionRule, ensure_usable_url, select_track},
        upstream::BilibiliApi,
    },
    types::{SubtitleTrack, ValidationOutcome, VideoId, VideoMetadata},
    validation::{ValidationThresholds, validate},
};

/// Disagreement between the `player/v2` and `player.so` listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingIssue {
    CountMismatch { primary: usize, secondary: usize },
    NoCommonLanguage,
    NoCommonUrl,
}

impl fmt::Display for ListingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingIssue::CountMismatch { primary, secondary } => write!(
                f,
                "listings disagree on track count (player/v2: {primary}, player.so: {secondary})"
            ),
            ListingIssue::NoCommonLanguage => {
                f.write_str("listings share no language code")
            }
            ListingIssue::NoCommonUrl => f.write_str("listings share no subtitle URL"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossCheck {
    pub issues: Vec<ListingIssue>,
}

impl CrossCheck {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Compare the two listings. Language and URL overlap are only judged when both are non-empty.
pub fn cross_check(primary: &[SubtitleTrack], secondary: &[SubtitleTrack]) -> CrossCheck {
    let mut issues = Vec::new();

    if primary.len() != secondary.len() {
        issues.push(ListingIssue::CountMismatch {
            primary: primary.len(),
            secondary: secondary.len(),
        });
    }

    if !primary.is_empty() && !secondary.is_empty() {
        let languages: HashSet<&str> = primary.iter().map(|t| t.language_code.as_str()).collect();
        if !secondary
            .iter()
            .any(|t| languages.contains(t.language_code.as_str()))
        {
            issues.push(ListingIssue::NoCommonLanguage);
        }

        let urls: HashSet<&str> = primary.iter().map(|t| t.download_url.as_str()).collect();
        if !secondary.iter().any(|t| urls.contains(t.download_url.as_str())) {
            issues.push(ListingIssue::NoCommonUrl);
        }
    }

    CrossCheck { issues }
}

#[derive(Debug)]
pub struct TrackReport {
    pub track: SubtitleTrack,
    pub transcript_chars: usize,
    pub result: Result<ValidationOutcome, ExtractError>,
}

#[derive(Debug)]
pub struct Diagnosis {
    pub bvid: VideoId,
    pub metadata: VideoMetadata,
    pub primary: Vec<SubtitleTrack>,
    pub primary_error: Option<String>,
    pub secondary: Vec<SubtitleTrack>,
    pub secondary_error: Option<String>,
    pub cross_check: CrossCheck,
    /// One report per merged catalog entry, in catalog order.
    pub tracks: Vec<TrackReport>,
    /// Index into `tracks` of what a normal extraction would pick.
    pub selected: Option<(usize, SelectionRule)>,
}

/// Gather everything a normal extraction would look at, without retries or early exits.
///
/// Only an unparseable URL or a failed metadata fetch aborts; listing and
/// download failures are recorded in the report.
pub async fn diagnose(
    api: &dyn BilibiliApi,
    video_url: &str,
    thresholds: &ValidationThresholds,
) -> Result<Diagnosis, ExtractError> {
    let bvid = extract_bvid(video_url)?;
    let metadata = api.video_info(&bvid).await?;
    info!(%bvid, title = %metadata.title, cid = metadata.cid, "diagnosing subtitles");

    let (primary, primary_error) = match api.player_v2(&bvid, metadata.cid).await {
        Ok(listing) => (listing.usable_tracks(), None),
        Err(e) => {
            warn!("player/v2 lookup failed: {e}");
            (Vec::new(), Some(e.to_string()))
        }
    };

    let (secondary, secondary_error) = match api.player_so(&bvid, metadata.cid).await {
        Ok(tracks) => (tracks, None),
        Err(e) => {
            warn!("player.so lookup failed: {e}");
            (Vec::new(), Some(e.to_string()))
        }
    };

    let cross_check = cross_check(&primary, &secondary);
    let catalog = merge_tracks(primary.clone(), secondary.clone());

    let selected = select_track(&catalog).and_then(|(picked, rule)| {
        catalog
            .tracks()
            .iter()
            .position(|t| std::ptr::eq(t, picked))
            .map(|idx| (idx, rule))
    });

    let mut tracks = Vec::with_capacity(catalog.len());
    for track in catalog.tracks() {
        let downloaded = match ensure_usable_url(track) {
            Ok(()) => download_transcript(api, track, &bvid).await,
            Err(e) => Err(e),
        };

        let (transcript_chars, result) = match downloaded {
            Ok(transcript) => {
                let outcome = validate(
                    &metadata.title,
                    &metadata.description,
                    &transcript.text,
                    &track.language_label,
                    thresholds,
                );
                (transcript.char_len(), Ok(outcome))
            }
            Err(e) => (0, Err(e)),
        };

        debug!(label = %track.language_label, ok = result.is_ok(), "track checked");
        tracks.push(TrackReport {
            track: track.clone(),
            transcript_chars,
            result,
        });
    }

    Ok(Diagnosis {
        bvid,
        metadata,
        primary,
        primary_error,
        secondary,
        secondary_error,
        cross_check,
        tracks,
        selected,
    })
}
