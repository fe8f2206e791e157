use std::sync::LazyLock;

use regex::Regex;

use crate::{error::ExtractError, types::VideoId};

// Order matters: the canonical path is preferred over the short-link host,
// and the bare code is the last resort.
static PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"bilibili\.com/video/(BV[0-9A-Za-z_]+)").expect("valid regex"),
        Regex::new(r"b23\.tv/([A-Za-z0-9]+)").expect("valid regex"),
        Regex::new(r"BV[0-9A-Za-z_]+").expect("valid regex"),
    ]
});

/// Parse a free-form Bilibili link into its video code.
pub fn extract_bvid(input: &str) -> Result<VideoId, ExtractError> {
    for pattern in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(input) {
            let code = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str());
            if let Some(code) = code {
                return Ok(VideoId::new(code));
            }
        }
    }

    Err(ExtractError::InvalidUrl {
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_video_path() {
        let id = extract_bvid("https://www.bilibili.com/video/BV1GJ411x7h7/?spm_id_from=333.788").unwrap();
        assert_eq!(id.as_str(), "BV1GJ411x7h7");
    }

    #[test]
    fn short_link_host() {
        let id = extract_bvid("【费曼学习法】 https://b23.tv/a1B2c3D").unwrap();
        assert_eq!(id.as_str(), "a1B2c3D");
    }

    #[test]
    fn bare_code_fallback() {
        let id = extract_bvid("look at BV1xx411c7mD please").unwrap();
        assert_eq!(id.as_str(), "BV1xx411c7mD");
    }

    #[test]
    fn trailing_chinese_text_is_not_part_of_the_code() {
        let id = extract_bvid("https://www.bilibili.com/video/BV1GJ411x7h7费曼学习法").unwrap();
        assert_eq!(id.as_str(), "BV1GJ411x7h7");

        let id = extract_bvid("看看这个BV1xx411c7mD的视频").unwrap();
        assert_eq!(id.as_str(), "BV1xx411c7mD");
    }

    #[test]
    fn canonical_path_wins_over_bare_code() {
        let id = extract_bvid("BVfirst https://bilibili.com/video/BVsecond").unwrap();
        assert_eq!(id.as_str(), "BVsecond");
    }

    #[test]
    fn unrelated_input_is_rejected() {
        for input in ["", "https://www.youtube.com/watch?v=abc", "bilibili.com/bangumi/play/ep1"] {
            let err = extract_bvid(input).unwrap_err();
            assert!(matches!(err, ExtractError::InvalidUrl { .. }), "{input}");
        }
    }
}
