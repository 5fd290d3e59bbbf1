//! Line-level cleanup of extracted article text.
//!
//! Three policies share the same character normalisation and
//! email/URL scrubbing, and differ in how aggressively lines are dropped:
//!
//! | Policy | Drops noise lines | Blank lines |
//! |--------|-------------------|-------------|
//! | [`CleanupPolicy::Standard`] | yes | one between every kept line |
//! | [`CleanupPolicy::Broadcast`] | no | removed |
//! | [`CleanupPolicy::Light`] | no | kept as paragraph breaks |

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
pub static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static MULTIDASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-–—]{3,}").unwrap());
static SPACE_BEFORE_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+\n").unwrap());
static MULTISPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Substrings (matched lowercase) that mark a whole line as boilerplate.
pub const BAN_SUBSTRINGS: &[&str] = &[
    "all rights reserved",
    "무단 전재",
    "무단전재",
    "재배포 금지",
    "ai학습 이용 금지",
    "저작권",
    "copyright",
    "구독",
    "앱에서 보기",
    "앱에서만",
    "뉴스레터",
    "알림 설정",
    "프리미엄",
    "유료회원",
    "공유하기",
    "페이스북",
    "트위터",
    "카카오",
    "인스타그램",
    "유튜브",
    "속보",
    "많이 본",
    "추천 기사",
    "연관 기사",
    "관련 기사",
    "문의:",
    "문의 ‧ 제보",
    "제보:",
    "광고 문의",
    "후원하기",
    "사진=",
    "영상=",
];

const MIN_LINE_CHARS: usize = 15;
const SHORT_LINE_CHARS: usize = 80;
const URL_SHARE_LIMIT: f64 = 0.3;

/// Which line filter to run over a page's extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Drop short and boilerplate lines.
    Standard,
    /// Keep every line; broadcast transcripts break lines on speaker turns.
    Broadcast,
    /// Keep every line and blank-line paragraph breaks.
    Light,
}

impl CleanupPolicy {
    pub fn apply(&self, text: &str) -> String {
        match self {
            CleanupPolicy::Standard => clean_standard(text),
            CleanupPolicy::Broadcast => clean_broadcast(text),
            CleanupPolicy::Light => clean_light(text),
        }
    }
}

/// Replace non-breaking spaces, drop zero-width characters and trailing
/// whitespace before line breaks.
fn normalize_chars(text: &str) -> String {
    let text: String = text
        .chars()
        .filter(|c| !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}'))
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();
    let text = text.replace("\r\n", "\n");
    SPACE_BEFORE_NEWLINE_RE.replace_all(&text, "\n").into_owned()
}

fn scrub_line(line: &str) -> String {
    let line = EMAIL_RE.replace_all(line, "");
    let line = URL_RE.replace_all(&line, "");
    MULTISPACE_RE.replace_all(&line, " ").trim().to_string()
}

fn collapse_blank_runs(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").trim().to_string()
}

/// True when a line looks like a byline, share bar, copyright notice or
/// similar furniture rather than article prose.
pub fn line_is_noise(line: &str) -> bool {
    let s = line.trim();
    if s.is_empty() {
        return true;
    }
    let len = s.chars().count();

    if EMAIL_RE.is_match(s) && len < SHORT_LINE_CHARS {
        return true;
    }
    if URL_RE.is_match(s) {
        let url_chars: usize = URL_RE.find_iter(s).map(|m| m.as_str().chars().count()).sum();
        if len < SHORT_LINE_CHARS || url_chars as f64 / len.max(1) as f64 > URL_SHARE_LIMIT {
            return true;
        }
    }
    if MULTIDASH_RE.is_match(s) {
        return true;
    }
    let low = s.to_lowercase();
    if BAN_SUBSTRINGS.iter().any(|bad| low.contains(bad)) {
        return true;
    }
    len < MIN_LINE_CHARS
}

fn clean_standard(text: &str) -> String {
    let text = normalize_chars(text);
    let kept: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line_is_noise(line))
        .map(scrub_line)
        .filter(|line| !line.is_empty())
        .collect();
    collapse_blank_runs(&kept.join("\n\n"))
}

fn clean_broadcast(text: &str) -> String {
    let text = normalize_chars(text);
    let kept: Vec<String> = text
        .lines()
        .map(scrub_line)
        .filter(|line| !line.is_empty())
        .collect();
    collapse_blank_runs(&kept.join("\n"))
}

fn clean_light(text: &str) -> String {
    let text = normalize_chars(text);
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                scrub_line(line)
            }
        })
        .collect();
    collapse_blank_runs(&lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROSE: &str = "정부는 오늘 내년도 예산안을 국회에 제출했다고 밝혔다.";

    #[test]
    fn test_standard_drops_short_and_banned_lines() {
        let raw = format!(
            "{PROSE}\n짧은 줄\n무단전재 및 재배포 금지 저작권자 뉴스\n{PROSE} 두번째 문단입니다."
        );
        let out = CleanupPolicy::Standard.apply(&raw);
        assert_eq!(out, format!("{PROSE}\n\n{PROSE} 두번째 문단입니다."));
    }

    #[test]
    fn test_standard_drops_contact_and_dash_lines() {
        let raw = format!("홍길동 기자 hong@example.com\n----------------------\n{PROSE}");
        assert_eq!(CleanupPolicy::Standard.apply(&raw), PROSE);
    }

    #[test]
    fn test_standard_scrubs_embedded_email_in_long_line() {
        let long = format!("{PROSE} {PROSE} 자세한 내용은 press@example.com 으로 보내주시면 됩니다.");
        assert!(long.chars().count() >= 80);
        let out = CleanupPolicy::Standard.apply(&long);
        assert!(!out.contains('@'));
        assert!(out.contains("자세한 내용은"));
    }

    #[test]
    fn test_url_dense_line_is_noise() {
        assert!(line_is_noise("기사 원문 https://example.com/a"));
        let long = format!("{PROSE} {PROSE} https://example.com/short");
        assert!(!line_is_noise(&long));
    }

    #[test]
    fn test_nbsp_and_zero_width_normalized() {
        let raw = "가\u{a0}나\u{200b}다 라마바사아자차카타파하 문장입니다.";
        let out = CleanupPolicy::Broadcast.apply(raw);
        assert_eq!(out, "가 나다 라마바사아자차카타파하 문장입니다.");
    }

    #[test]
    fn test_broadcast_keeps_short_lines_and_drops_blanks() {
        let raw = "앵커: 안녕하세요\n\n\n\n기자: 네\n속보입니다 http://x.y/z";
        assert_eq!(
            CleanupPolicy::Broadcast.apply(raw),
            "앵커: 안녕하세요\n기자: 네\n속보입니다"
        );
    }

    #[test]
    fn test_light_keeps_single_blank_line_between_paragraphs() {
        let raw = "첫 문단\n\n\n\n둘째 문단\n셋째 줄";
        assert_eq!(CleanupPolicy::Light.apply(raw), "첫 문단\n\n둘째 문단\n셋째 줄");
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let p: CleanupPolicy = serde_json::from_str("\"broadcast\"").unwrap();
        assert_eq!(p, CleanupPolicy::Broadcast);
    }
}
