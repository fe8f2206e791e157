mod common;

use std::time::Duration;

use bilinote_core::{
    BilibiliApi, ExtractError, HttpBilibiliApi, UpstreamConfig, VideoId, extract_bvid,
    extract::upstream::USER_AGENT,
};
use serde_json::json;

use common::{MockServer, Reply};

fn bvid() -> VideoId {
    extract_bvid("BV1GJ411x7h7").unwrap()
}

fn api(server: &MockServer, cookie: Option<&str>) -> HttpBilibiliApi {
    HttpBilibiliApi::new(UpstreamConfig {
        api_base: server.base_url(),
        cookie: cookie.map(str::to_string),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn view_request_carries_browser_headers_and_cookie() {
    let server = MockServer::start(vec![(
        "/x/web-interface/view",
        Reply::json(json!({
            "code": 0,
            "data": { "title": "费曼的学习心智模型", "desc": "学习方法", "cid": 42 }
        })),
    )])
    .await;

    let meta = api(&server, Some("SESSDATA=abc"))
        .video_info(&bvid())
        .await
        .unwrap();
    assert_eq!(meta.cid, 42);
    assert_eq!(meta.title, "费曼的学习心智模型");

    let request = server.only_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.query(), "bvid=BV1GJ411x7h7");
    assert_eq!(request.header("user-agent"), Some(USER_AGENT));
    assert_eq!(request.header("referer"), Some("https://www.bilibili.com"));
    assert_eq!(request.header("cookie"), Some("SESSDATA=abc"));
}

#[tokio::test]
async fn blank_cookie_is_not_sent() {
    let server = MockServer::start(vec![(
        "/x/player/v2",
        Reply::json(json!({
            "code": 0,
            "data": { "subtitle": { "subtitles": [
                { "lan": "zh-CN", "lan_doc": "中文（中国）", "subtitle_url": "//i0.hdslb.com/zh.json" }
            ]}}
        })),
    )])
    .await;

    let listing = api(&server, Some("   ")).player_v2(&bvid(), 42).await.unwrap();
    assert_eq!(listing.tracks.len(), 1);

    let request = server.only_request();
    assert_eq!(request.query(), "bvid=BV1GJ411x7h7&cid=42");
    assert_eq!(request.header("cookie"), None);
    assert_eq!(request.header("user-agent"), Some(USER_AGENT));
}

#[tokio::test]
async fn player_so_posts_form_body() {
    let xml = r#"<root><subtitle>{"subtitles":[{"lan":"zh-Hans","lan_doc":"中文（简体）","subtitle_url":"//i0.hdslb.com/so.json"}]}</subtitle></root>"#;
    let server =
        MockServer::start(vec![("/x/player.so", Reply::text(200, "text/xml", xml))]).await;

    let tracks = api(&server, None).player_so(&bvid(), 42).await.unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].language_code, "zh-Hans");

    let request = server.only_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.body, "cid=42&aid=&bvid=BV1GJ411x7h7");
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.header("referer"), Some("https://www.bilibili.com"));
    assert_eq!(request.header("cookie"), None);
}

#[tokio::test]
async fn subtitle_download_uses_video_page_referer() {
    let server = MockServer::start(vec![(
        "/bfs/subtitle/zh.json",
        Reply::json(json!({ "body": [ { "from": 0.0, "to": 1.0, "content": "你好" } ] })),
    )])
    .await;

    let doc = api(&server, Some("SESSDATA=abc"))
        .subtitle_body(&server.url("/bfs/subtitle/zh.json"), &bvid())
        .await
        .unwrap();
    assert_eq!(doc["body"][0]["content"], "你好");

    let request = server.only_request();
    assert_eq!(
        request.header("referer"),
        Some("https://www.bilibili.com/video/BV1GJ411x7h7")
    );
    assert_eq!(request.header("user-agent"), Some(USER_AGENT));
    assert_eq!(request.header("cookie"), Some("SESSDATA=abc"));
}

#[tokio::test]
async fn error_status_is_a_network_error() {
    let server = MockServer::start(vec![(
        "/x/web-interface/view",
        Reply::text(500, "text/plain", "boom"),
    )])
    .await;

    let err = api(&server, None).video_info(&bvid()).await.unwrap_err();
    assert!(matches!(err, ExtractError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn non_json_subtitle_is_malformed_data() {
    let server = MockServer::start(vec![(
        "/bfs/subtitle/zh.json",
        Reply::text(200, "text/html", "<html>expired</html>"),
    )])
    .await;

    let err = api(&server, None)
        .subtitle_body(&server.url("/bfs/subtitle/zh.json"), &bvid())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::MalformedSubtitleData(_)), "{err:?}");
}
