use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

static CJK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{4e00}-\u{9fa5}]{2,}").expect("valid regex"));

const STOP_WORDS: &[&str] = &[
    "这个", "那个", "一些", "这些", "那些", "可以", "已经", "就是", "所以", "因为", "但是",
    "然后", "这样", "那么", "这里", "那里", "一直", "现在", "不是", "没有", "什么", "也是",
    "很多", "非常", "比较", "都", "还", "也", "就", "才", "会", "到", "来", "要", "被", "把",
    "去", "从", "上", "下", "中", "前", "后", "左", "右", "内", "外", "间", "时", "年", "月",
    "日", "人", "个", "的", "了", "和", "是", "在", "我", "有", "他", "她",
    "about", "above", "across", "after", "again", "against", "all", "almost", "along",
    "also", "although", "always", "among", "an", "and", "another", "any", "are", "around",
    "as", "at", "back", "been", "before", "began", "being", "below", "between", "both",
    "but", "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "each",
    "during", "either", "else", "even", "ever", "every", "first", "for", "found", "from",
    "had", "has", "have", "having", "her", "here", "him", "his", "how", "however", "hundred",
    "into", "its", "just", "know", "large", "last", "later", "like", "little", "long",
    "made", "make", "man", "many", "may", "men", "might", "more", "most", "much", "must",
    "never", "new", "next", "not", "now", "num", "number", "off", "old", "once", "one",
    "only", "other", "our", "out", "over", "own", "part", "people", "place", "put", "real",
    "right", "said", "same", "saw", "say", "see", "seem", "several", "she", "should", "show",
    "side", "small", "so", "some", "something", "take", "tell", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "thing", "think", "this", "through", "time",
    "to", "too", "two", "under", "up", "use", "very", "was", "water", "way", "we", "well",
    "went", "were", "what", "when", "where", "which", "while", "who", "will", "with", "words",
    "work", "world", "would", "write", "year", "years", "you", "your",
];

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

fn is_separator(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303f}'
        | '\u{ff00}'..='\u{ffef}'
        | '\u{2000}'..='\u{206f}'
        | '\u{0020}'..='\u{002f}'
        | '\u{003a}'..='\u{0040}'
        | '\u{005b}'..='\u{0060}'
        | '\u{007b}'..='\u{007e}')
}

fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

/// Split a CJK run into shorter pieces so paraphrased transcripts still match.
fn decompose_cjk_run(run: &str, out: &mut Vec<String>) {
    let chars: Vec<char> = run.chars().collect();
    let len = chars.len();

    if len >= 6 {
        for start in (0..len - 2).step_by(2) {
            out.push(chars[start..start + 3].iter().collect());
        }
        out.push(run.to_string());
    } else if len >= 4 {
        out.push(chars[..3].iter().collect());
        out.push(chars[len - 3..].iter().collect());
        out.push(run.to_string());
    } else {
        out.push(run.to_string());
    }
}

/// Keyword candidates of `text`, CJK first and longest first.
pub fn extract_keywords(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let cleaned: String = text
        .chars()
        .map(|c| if is_separator(c) { ' ' } else { c })
        .collect();

    let mut words: Vec<String> = cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() >= 2 && w.chars().any(|c| c.is_ascii_alphabetic()))
        .map(str::to_string)
        .collect();

    for run in CJK_RUN.find_iter(text) {
        decompose_cjk_run(run.as_str(), &mut words);
    }

    let mut seen = HashSet::new();
    let mut keywords: Vec<String> = words
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .filter(|w| w.chars().count() >= 2)
        .filter(|w| !is_stop_word(w))
        .collect();

    keywords.sort_by(|a, b| {
        let a_cjk = a.chars().any(is_cjk);
        let b_cjk = b.chars().any(is_cjk);
        b_cjk
            .cmp(&a_cjk)
            .then_with(|| b.chars().count().cmp(&a.chars().count()))
    });

    keywords
}
