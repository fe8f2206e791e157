use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::ConfigError, types::ValidationOutcome, validation::keywords::extract_keywords};

/// Empirically tuned limits of the relevance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    /// Transcripts shorter than this (in characters) are rejected outright.
    pub min_transcript_chars: usize,
    pub match_threshold: f64,
    /// Used when the track label marks it as AI-generated; AI transcripts paraphrase more.
    pub ai_match_threshold: f64,
    pub long_transcript_chars: usize,
    pub long_transcript_min_matches: usize,
    pub max_checked_keywords: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_transcript_chars: 50,
            match_threshold: 0.15,
            ai_match_threshold: 0.10,
            long_transcript_chars: 2000,
            long_transcript_min_matches: 3,
            max_checked_keywords: 20,
        }
    }
}

impl ValidationThresholds {
    /// Rates must lie in `[0, 1]` and at least one keyword must be checked.
    pub fn check(&self) -> Result<(), ConfigError> {
        let rates = [
            ("validation.match_threshold", self.match_threshold),
            ("validation.ai_match_threshold", self.ai_match_threshold),
        ];
        for (key, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: rate.to_string(),
                });
            }
        }

        if self.max_checked_keywords == 0 {
            return Err(ConfigError::InvalidValue {
                key: "validation.max_checked_keywords",
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}

/// Title keywords followed by description keywords, without duplicates.
pub fn video_keywords(title: &str, description: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_keywords(title)
        .into_iter()
        .chain(extract_keywords(description))
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

/// Check that a downloaded transcript plausibly belongs to the video.
///
/// This catches gross mismatches (another video's subtitles entirely), not
/// subtle ones; false accepts and rejects at the margins are expected.
pub fn validate(
    title: &str,
    description: &str,
    transcript: &str,
    track_label: &str,
    limits: &ValidationThresholds,
) -> ValidationOutcome {
    let transcript_chars = transcript.chars().count();
    debug!(title, track_label, transcript_chars, "validating transcript");

    if transcript_chars < limits.min_transcript_chars {
        return ValidationOutcome {
            accepted: false,
            match_rate: 0.0,
            matched_keywords: Vec::new(),
            checked_keywords: 0,
            reason: Some(format!(
                "transcript too short ({transcript_chars} < {} characters)",
                limits.min_transcript_chars
            )),
        };
    }

    let keywords = video_keywords(title, description);
    let checked: Vec<&String> = keywords.iter().take(limits.max_checked_keywords).collect();
    if checked.is_empty() {
        debug!("no keywords extracted, skipping relevance check");
        return ValidationOutcome {
            accepted: true,
            match_rate: 1.0,
            matched_keywords: Vec::new(),
            checked_keywords: 0,
            reason: Some("no keywords to validate against".to_string()),
        };
    }

    let matched_keywords: Vec<String> = checked
        .iter()
        .filter(|k| transcript.contains(k.as_str()))
        .map(|k| k.to_string())
        .collect();
    let match_rate = matched_keywords.len() as f64 / checked.len() as f64;

    debug!(
        matched = matched_keywords.len(),
        checked = checked.len(),
        "keyword matches: {:?}",
        matched_keywords
    );

    let threshold = if track_label.contains("AI") {
        limits.ai_match_threshold
    } else {
        limits.match_threshold
    };

    if transcript_chars > limits.long_transcript_chars
        && matched_keywords.len() >= limits.long_transcript_min_matches
    {
        info!(
            matched = matched_keywords.len(),
            "long transcript with enough keyword matches, accepting"
        );
        return ValidationOutcome {
            accepted: true,
            match_rate,
            checked_keywords: checked.len(),
            matched_keywords,
            reason: Some("long transcript with enough keyword matches".to_string()),
        };
    }

    if match_rate >= threshold {
        return ValidationOutcome {
            accepted: true,
            match_rate,
            checked_keywords: checked.len(),
            matched_keywords,
            reason: None,
        };
    }

    ValidationOutcome {
        accepted: false,
        match_rate,
        checked_keywords: checked.len(),
        matched_keywords,
        reason: Some(format!(
            "keyword match rate too low ({:.1}% < {:.0}%)",
            match_rate * 100.0,
            threshold * 100.0
        )),
    }
}
