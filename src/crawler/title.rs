//! Headline recovery and title comparison.
//!
//! The fallback page's headline is compared against the issue feed's title
//! to tell a stale reference title from a page that is not the article at all.

use crate::crawler::jsonld;
use crate::utils::{char_len, normalize_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;

static TWITTER_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="twitter:title"]"#).unwrap());
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_TITLE_BY_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="og:title"]"#).unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Titles that are only an outlet's name.
static GENERIC_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    let patterns = [
        r"경향\s*신문",
        r"The\s+Kyunghyang\s+Shinmun",
        r"한겨레",
        r"Hankyoreh",
        r"SBS\s*뉴스",
        r"KBS\s*뉴스",
        r"MBC\s*뉴스",
        r"조선일보",
        r"중앙일보",
        r"동아일보",
        r"국민일보",
        r"Chosun\s*Ilbo",
        r"JoongAng\s*Ilbo",
        r"Donga\s*Ilbo",
    ];
    Regex::new(&format!(r"(?i)^\s*(?:{})\s*$", patterns.join("|"))).unwrap()
});

static NON_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9A-Za-z가-힣 ]").unwrap());

const MIN_TITLE_CHARS: usize = 4;

/// Recover the page's headline.
///
/// Tries, in order: JSON-LD `headline`, `twitter:title`, `og:title`, the
/// first `<h1>`, then `<title>`. Returns the first non-empty match,
/// normalised, or an empty string.
pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    title_from_document(&document)
}

pub fn title_from_document(document: &Html) -> String {
    let objects = jsonld::json_ld_objects(document);
    if let Some(headline) = jsonld::headline(&objects) {
        return normalize_text(&headline);
    }

    for selector in [&*TWITTER_TITLE, &*OG_TITLE, &*OG_TITLE_BY_NAME] {
        let content = document
            .select(selector)
            .filter_map(|m| m.value().attr("content"))
            .find(|c| !c.trim().is_empty());
        if let Some(content) = content {
            return normalize_text(content);
        }
    }

    for selector in [&*H1, &*TITLE] {
        if let Some(text) = document
            .select(selector)
            .next()
            .map(|el| el.text().map(str::trim).filter(|t| !t.is_empty()).collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
        {
            return normalize_text(&text);
        }
    }

    String::new()
}

/// True when `title` tells us nothing about the article: empty, very short,
/// just an outlet name, or equal to `provider` ignoring whitespace.
pub fn is_generic_title(title: &str, provider: &str) -> bool {
    let t = title.trim();
    if t.is_empty() {
        return true;
    }
    if GENERIC_TITLE_RE.is_match(t) {
        return true;
    }
    let squeeze = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    if squeeze(t) == squeeze(provider) {
        return true;
    }
    char_len(t) < MIN_TITLE_CHARS
}

fn tokens(s: &str) -> HashSet<String> {
    NON_TOKEN_RE
        .replace_all(s, " ")
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard index of the two titles' token sets.
///
/// Tokens are runs of ASCII letters, digits and Hangul syllables, case
/// folded. Returns 0.0 when either side has no tokens.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    inter as f64 / union as f64
}
