use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
    error::ExtractError,
    extract::{
        bvid::extract_bvid,
        catalog::fetch_catalog,
        diagnose::{Diagnosis, diagnose},
        download::download_transcript,
        selector::{ensure_usable_url, select_track},
        upstream::{BilibiliApi, HttpBilibiliApi, UpstreamConfig},
    },
    types::{Extraction, ValidationOutcome, VideoId, VideoMetadata},
    validation::{ValidationThresholds, validate},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `3` means up to four attempts.
    pub max_retries: u32,
    /// Wait before retrying when the selected track had an unusable URL.
    pub invalid_track_delay: Duration,
    /// Linear backoff step after a rejected or malformed transcript.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            invalid_track_delay: Duration::from_secs(2),
            backoff_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (zero-based): 2s, 4s, 6s.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * (attempt + 1)
    }
}

/// Everything the extractor needs, passed in explicitly.
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    pub upstream: UpstreamConfig,
    pub retry: RetryPolicy,
    pub thresholds: ValidationThresholds,
}

#[derive(Debug, Clone, Copy)]
struct AttemptState {
    index: u32,
    max_retries: u32,
}

impl AttemptState {
    fn new(max_retries: u32) -> Self {
        Self {
            index: 0,
            max_retries,
        }
    }

    fn number(&self) -> u32 {
        self.index + 1
    }

    fn total(&self) -> u32 {
        self.max_retries + 1
    }

    fn can_retry(&self) -> bool {
        self.index < self.max_retries
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

/// Result of one pass through the pipeline that got as far as validation.
struct AttemptOutcome {
    metadata: VideoMetadata,
    transcript: String,
    track_label: String,
    validation: ValidationOutcome,
}

/// Subtitle extraction: BVID → metadata → catalog → track → transcript → validation,
/// re-run from the top with backoff when the transcript looks wrong.
#[derive(Clone)]
pub struct Extractor {
    api: Arc<dyn BilibiliApi>,
    retry: RetryPolicy,
    thresholds: ValidationThresholds,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        let api = HttpBilibiliApi::new(config.upstream)?;
        Ok(Self::with_api(Arc::new(api), config.retry, config.thresholds))
    }

    pub fn with_api(
        api: Arc<dyn BilibiliApi>,
        retry: RetryPolicy,
        thresholds: ValidationThresholds,
    ) -> Self {
        Self {
            api,
            retry,
            thresholds,
        }
    }

    pub async fn extract(&self, video_url: &str) -> Result<Extraction, ExtractError> {
        self.extract_with_cancel(video_url, CancellationToken::new())
            .await
    }

    pub async fn extract_with_cancel(
        &self,
        video_url: &str,
        cancel: CancellationToken,
    ) -> Result<Extraction, ExtractError> {
        let bvid = extract_bvid(video_url)?;
        let span = info_span!("extract", request_id = %Uuid::new_v4(), %bvid);

        self.run(bvid, cancel).instrument(span).await
    }

    /// One-shot report of both listings and every track's relevance, without retries.
    pub async fn diagnose(&self, video_url: &str) -> Result<Diagnosis, ExtractError> {
        diagnose(self.api.as_ref(), video_url, &self.thresholds).await
    }

    async fn run(&self, bvid: VideoId, cancel: CancellationToken) -> Result<Extraction, ExtractError> {
        let mut state = AttemptState::new(self.retry.max_retries);

        loop {
            if cancel.is_cancelled() {
                return Err(ExtractError::Cancelled);
            }

            info!("extraction attempt {}/{}", state.number(), state.total());

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                res = self.attempt(&bvid) => res,
            };

            let delay = match attempt {
                Ok(outcome) if outcome.validation.accepted => {
                    info!(
                        match_rate = outcome.validation.match_rate,
                        matched = ?outcome.validation.matched_keywords.iter().take(5).collect::<Vec<_>>(),
                        "transcript accepted"
                    );
                    return Ok(Extraction {
                        bvid,
                        title: outcome.metadata.title,
                        transcript: outcome.transcript,
                        track_label: outcome.track_label,
                        match_rate: outcome.validation.match_rate,
                        attempts: state.number(),
                    });
                }
                Ok(outcome) => {
                    let reason = outcome
                        .validation
                        .reason
                        .clone()
                        .unwrap_or_else(|| "rejected".to_string());
                    let preview: String = outcome.transcript.chars().take(150).collect();
                    warn!(
                        title = %outcome.metadata.title,
                        track = %outcome.track_label,
                        match_rate = outcome.validation.match_rate,
                        %reason,
                        %preview,
                        "transcript does not match the video"
                    );

                    if !state.can_retry() {
                        return Err(ExtractError::ValidationExhausted {
                            title: outcome.metadata.title,
                            match_rate: outcome.validation.match_rate,
                            reason,
                            attempts: state.number(),
                        });
                    }
                    self.retry.backoff(state.index)
                }
                Err(err) if err.is_track_url_error() => {
                    warn!("selected track is unusable: {err}");
                    if !state.can_retry() {
                        let label = match err {
                            ExtractError::InvalidTrackUrl { label }
                            | ExtractError::MalformedTrackUrl { label, .. } => label,
                            _ => String::new(),
                        };
                        return Err(ExtractError::SubtitleUrlInvalid {
                            label,
                            attempts: state.number(),
                        });
                    }
                    self.retry.invalid_track_delay
                }
                Err(err) if err.is_retryable() => {
                    warn!("subtitle download unusable: {err}");
                    if !state.can_retry() {
                        return Err(err);
                    }
                    self.retry.backoff(state.index)
                }
                Err(err) => return Err(err),
            };

            info!(
                "retrying in {:.1}s ({}/{})",
                delay.as_secs_f64(),
                state.number(),
                self.retry.max_retries
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            state.advance();
        }
    }

    /// One full pass; nothing is reused from earlier attempts.
    async fn attempt(&self, bvid: &VideoId) -> Result<AttemptOutcome, ExtractError> {
        let api = self.api.as_ref();

        let metadata = api.video_info(bvid).await?;
        debug!(title = %metadata.title, cid = metadata.cid, "video metadata");

        let catalog = fetch_catalog(api, bvid, metadata.cid).await?;
        for (idx, track) in catalog.tracks().iter().enumerate() {
            debug!(
                "  [{idx}] {} ({}) {:?} ai={}",
                track.language_label, track.language_code, track.source, track.is_ai_generated
            );
        }

        let (track, rule) = select_track(&catalog).ok_or(ExtractError::NoSubtitlesAvailable)?;
        debug!(
            ?rule,
            label = %track.language_label,
            code = %track.language_code,
            "selected subtitle track"
        );
        ensure_usable_url(track)?;

        let transcript = download_transcript(api, track, bvid).await?;

        let validation = validate(
            &metadata.title,
            &metadata.description,
            &transcript.text,
            &track.language_label,
            &self.thresholds,
        );

        Ok(AttemptOutcome {
            track_label: track.language_label.clone(),
            transcript: transcript.text,
            metadata,
            validation,
        })
    }
}
