//! Subtitle acquisition: from a video URL to a validated transcript.

pub mod bvid;
pub mod catalog;
pub mod diagnose;
pub mod download;
pub mod orchestrator;
pub mod selector;
pub mod upstream;

pub use bvid::extract_bvid;
pub use catalog::{PrimaryListing, fetch_catalog, merge_tracks, parse_player_so, parse_player_v2};
pub use diagnose::{CrossCheck, Diagnosis, ListingIssue, TrackReport, cross_check, diagnose};
pub use download::{normalize_subtitle_url, parse_subtitle_body};
pub use orchestrator::{Extractor, ExtractorConfig, RetryPolicy};
pub use selector::{SelectionRule, ensure_usable_url, select_track};
pub use upstream::{BilibiliApi, HttpBilibiliApi, UpstreamConfig, parse_view_response};
