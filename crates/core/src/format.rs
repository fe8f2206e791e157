use crate::{
    extract::diagnose::Diagnosis,
    types::{Extraction, TrackSource},
};

/// Plain Markdown note used when no AI provider is available or the call fails.
pub fn format_fallback_note(title: &str, transcript: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", title));

    output.push_str("## 📝 内容摘要\n\n");
    output.push_str(&format!(
        "这是关于\"{}\"的视频内容。以下是基于字幕的文本整理。\n\n",
        title
    ));

    output.push_str("## 📖 字幕内容\n\n");
    output.push_str(transcript.trim_end());
    output.push_str("\n\n");

    output.push_str("## 🔑 关键要点\n\n");
    for point in [
        "详细内容请查看上方字幕文本",
        "建议结合视频进行学习",
        "可以根据需要整理自己的笔记",
    ] {
        output.push_str(&format!("- {}\n", point));
    }
    output.push('\n');

    output.push_str("---\n\n");
    output.push_str("*注意：此笔记是基于字幕自动生成，建议人工审核和补充。*\n");

    output
}

/// Short summary line for an extraction, used by the CLI.
pub fn format_extraction_summary(extraction: &Extraction) -> String {
    format!(
        "{} [{}] | track: {} | match: {:.1}% | attempts: {}",
        extraction.title,
        extraction.bvid,
        extraction.track_label,
        extraction.match_rate * 100.0,
        extraction.attempts
    )
}

/// Multi-line plain-text report for `Diagnosis`, one line per track.
pub fn format_diagnosis(diagnosis: &Diagnosis) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} [{}] cid={}\n",
        diagnosis.metadata.title, diagnosis.bvid, diagnosis.metadata.cid
    ));

    for (name, tracks, error) in [
        ("player/v2", &diagnosis.primary, &diagnosis.primary_error),
        ("player.so", &diagnosis.secondary, &diagnosis.secondary_error),
    ] {
        match error {
            Some(e) => out.push_str(&format!("{name}: failed ({e})\n")),
            None => out.push_str(&format!("{name}: {} track(s)\n", tracks.len())),
        }
    }

    if diagnosis.cross_check.is_consistent() {
        out.push_str("cross-check: consistent\n");
    } else {
        out.push_str("cross-check:\n");
        for issue in &diagnosis.cross_check.issues {
            out.push_str(&format!("  - {issue}\n"));
        }
    }

    if diagnosis.tracks.is_empty() {
        out.push_str("tracks: none\n");
        return out;
    }

    out.push_str("tracks:\n");
    for (idx, report) in diagnosis.tracks.iter().enumerate() {
        let track = &report.track;
        let source = match track.source {
            TrackSource::Primary => "player/v2",
            TrackSource::Secondary => "player.so",
        };
        let verdict = match &report.result {
            Ok(outcome) => format!(
                "{} chars, match {:.1}% ({}/{}), {}",
                report.transcript_chars,
                outcome.match_rate * 100.0,
                outcome.matched_keywords.len(),
                outcome.checked_keywords,
                if outcome.accepted { "accepted" } else { "rejected" }
            ),
            Err(e) => format!("error: {e}"),
        };

        out.push_str(&format!(
            "  [{}] {} ({}, {source}) {verdict}",
            idx + 1,
            track.language_label,
            track.language_code
        ));
        if let Some((_, rule)) = diagnosis.selected.filter(|(selected, _)| *selected == idx) {
            out.push_str(&format!(" <- selected ({rule:?})"));
        }
        out.push('\n');
    }

    out
}
