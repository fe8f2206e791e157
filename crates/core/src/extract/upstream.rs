use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::ExtractError,
    extract::{
        catalog::{PrimaryListing, parse_player_so, parse_player_v2},
        download::normalize_subtitle_url,
    },
    types::{SubtitleTrack, VideoId, VideoMetadata},
};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const REFERER: &str = "https://www.bilibili.com";
pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_base: String,
    /// Session cookie; without it AI subtitles are usually not listed.
    pub cookie: Option<String>,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            cookie: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// The four Bilibili endpoints the extraction pipeline talks to.
#[async_trait]
pub trait BilibiliApi: Send + Sync {
    /// `x/web-interface/view`
    async fn video_info(&self, bvid: &VideoId) -> Result<VideoMetadata, ExtractError>;

    /// `x/player/v2`
    async fn player_v2(&self, bvid: &VideoId, cid: u64) -> Result<PrimaryListing, ExtractError>;

    /// Legacy `x/player.so`, XML with an embedded JSON subtitle blob.
    async fn player_so(&self, bvid: &VideoId, cid: u64)
    -> Result<Vec<SubtitleTrack>, ExtractError>;

    /// Raw JSON document behind a track's download URL.
    async fn subtitle_body(&self, url: &str, bvid: &VideoId) -> Result<Value, ExtractError>;
}

pub struct HttpBilibiliApi {
    client: Client,
    config: UpstreamConfig,
}

impl HttpBilibiliApi {
    pub fn new(config: UpstreamConfig) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn with_session(&self, request: RequestBuilder, referer: &str) -> RequestBuilder {
        let request = request.header(header::REFERER, referer);
        match self.config.cookie.as_deref().map(str::trim) {
            Some(cookie) if !cookie.is_empty() => request.header(header::COOKIE, cookie),
            _ => request,
        }
    }
}

#[async_trait]
impl BilibiliApi for HttpBilibiliApi {
    async fn video_info(&self, bvid: &VideoId) -> Result<VideoMetadata, ExtractError> {
        let request = self
            .client
            .get(self.endpoint("/x/web-interface/view"))
            .query(&[("bvid", bvid.as_str())]);

        let body: Value = self
            .with_session(request, REFERER)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_view_response(bvid, &body)
    }

    async fn player_v2(&self, bvid: &VideoId, cid: u64) -> Result<PrimaryListing, ExtractError> {
        let cid = cid.to_string();
        let request = self
            .client
            .get(self.endpoint("/x/player/v2"))
            .query(&[("bvid", bvid.as_str()), ("cid", cid.as_str())]);

        let body: Value = self
            .with_session(request, REFERER)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(subtitle = %body["data"]["subtitle"], "player/v2 subtitle object");
        parse_player_v2(&body)
    }

    async fn player_so(
        &self,
        bvid: &VideoId,
        cid: u64,
    ) -> Result<Vec<SubtitleTrack>, ExtractError> {
        let request = self
            .client
            .post(self.endpoint("/x/player.so"))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("cid={cid}&aid=&bvid={bvid}"));

        let xml = self
            .with_session(request, REFERER)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_player_so(&xml)
    }

    async fn subtitle_body(&self, url: &str, bvid: &VideoId) -> Result<Value, ExtractError> {
        let full_url = normalize_subtitle_url(url);
        let referer = format!("{REFERER}/video/{bvid}");
        debug!(url = %full_url, "downloading subtitle");

        let text = self
            .with_session(self.client.get(&full_url), &referer)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        serde_json::from_str(&text).map_err(|e| {
            ExtractError::MalformedSubtitleData(format!("response is not JSON: {e}"))
        })
    }
}

/// Check the `code` field every Bilibili JSON envelope carries and hand back `data`.
pub(crate) fn unwrap_envelope<'a>(
    endpoint: &'static str,
    body: &'a Value,
) -> Result<&'a Value, ExtractError> {
    match body["code"].as_i64() {
        Some(0) => Ok(&body["data"]),
        code => Err(ExtractError::UpstreamRejected {
            endpoint,
            code: code.unwrap_or(-1),
            message: body["message"]
                .as_str()
                .filter(|m| !m.is_empty())
                .unwrap_or("request rejected")
                .to_string(),
        }),
    }
}

pub fn parse_view_response(bvid: &VideoId, body: &Value) -> Result<VideoMetadata, ExtractError> {
    let data = unwrap_envelope("web-interface/view", body)?;

    let cid = data["cid"].as_u64().filter(|cid| *cid != 0).ok_or_else(|| {
        ExtractError::MissingContentId {
            bvid: bvid.to_string(),
        }
    })?;

    Ok(VideoMetadata {
        title: data["title"].as_str().unwrap_or_default().to_string(),
        description: data["desc"].as_str().unwrap_or_default().to_string(),
        cid,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bvid() -> VideoId {
        VideoId::new("BV1GJ411x7h7")
    }

    #[test]
    fn view_response_yields_metadata() {
        let body = json!({
            "code": 0,
            "message": "0",
            "data": { "title": "费曼的学习心智模型", "desc": "如何真正理解知识", "cid": 123456 }
        });

        let meta = parse_view_response(&bvid(), &body).unwrap();
        assert_eq!(meta.title, "费曼的学习心智模型");
        assert_eq!(meta.description, "如何真正理解知识");
        assert_eq!(meta.cid, 123456);
    }

    #[test]
    fn non_zero_code_is_upstream_rejection() {
        let body = json!({ "code": -404, "message": "啥都木有", "data": null });

        match parse_view_response(&bvid(), &body) {
            Err(ExtractError::UpstreamRejected { code, message, .. }) => {
                assert_eq!(code, -404);
                assert_eq!(message, "啥都木有");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_cid_is_reported() {
        let body = json!({ "code": 0, "data": { "title": "t", "desc": "" } });
        assert!(matches!(
            parse_view_response(&bvid(), &body),
            Err(ExtractError::MissingContentId { .. })
        ));
    }

    #[test]
    fn envelope_without_code_is_rejected() {
        let body = json!({ "data": {} });
        assert!(matches!(
            unwrap_envelope("player/v2", &body),
            Err(ExtractError::UpstreamRejected { code: -1, .. })
        ));
    }
}
