//! Heuristic for "this body was cut off upstream".

use crate::utils::char_len;
use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence-final punctuation anywhere in the tail, or a Korean declarative
/// ending or closing quote at the very end.
static SENTENCE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?…]|[다요죠]\s*$|["'”’]\s*$"#).unwrap());

/// True when `text` is empty, shorter than `min_len` chars, or its last
/// `tail_window` chars carry no sentence ending.
pub fn looks_truncated(text: &str, min_len: usize, tail_window: usize) -> bool {
    let text = text.trim();
    if text.is_empty() || char_len(text) < min_len {
        return true;
    }
    !SENTENCE_END_RE.is_match(tail(text, tail_window))
}

fn tail(text: &str, window: usize) -> &str {
    let total = char_len(text);
    if total <= window {
        return text;
    }
    match text.char_indices().nth(total - window) {
        Some((at, _)) => &text[at..],
        None => text,
    }
}
