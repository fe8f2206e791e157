use serde_json::Value;
use tracing::debug;

use crate::{
    error::ExtractError,
    extract::upstream::BilibiliApi,
    types::{Segment, SubtitleTrack, Transcript, VideoId},
};

/// Subtitle URLs are usually protocol-relative (`//i0.hdslb.com/...`).
pub fn normalize_subtitle_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("https:{url}")
    }
}

/// Turn a subtitle JSON document (`{"body": [{"from", "to", "content"}]}`) into a transcript.
pub fn parse_subtitle_body(doc: &Value) -> Result<Transcript, ExtractError> {
    let Some(obj) = doc.as_object() else {
        return Err(ExtractError::MalformedSubtitleData(
            "subtitle document is not an object".into(),
        ));
    };

    let Some(body) = obj.get("body").and_then(Value::as_array) else {
        let preview: String = doc.to_string().chars().take(200).collect();
        return Err(ExtractError::MalformedSubtitleData(format!(
            "missing `body` array in {preview}"
        )));
    };

    if body.is_empty() {
        return Err(ExtractError::EmptySubtitle);
    }

    let segments = body
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let content = item["content"].as_str().ok_or_else(|| {
                ExtractError::MalformedSubtitleData(format!("segment {i} has no `content` string"))
            })?;
            Ok(Segment {
                from: item["from"].as_f64().unwrap_or_default(),
                to: item["to"].as_f64().unwrap_or_default(),
                content: content.to_string(),
            })
        })
        .collect::<Result<Vec<_>, ExtractError>>()?;

    Ok(Transcript::from_segments(&segments))
}

pub async fn download_transcript(
    api: &dyn BilibiliApi,
    track: &SubtitleTrack,
    bvid: &VideoId,
) -> Result<Transcript, ExtractError> {
    let doc = api.subtitle_body(&track.download_url, bvid).await?;
    let transcript = parse_subtitle_body(&doc)?;

    debug!(
        segments = transcript.segment_count,
        chars = transcript.char_len(),
        "subtitle downloaded"
    );

    Ok(transcript)
}
