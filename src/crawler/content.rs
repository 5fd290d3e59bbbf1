//! Article body extraction from a decoded page.
//!
//! A page is parsed once per [`HtmlParser`] and a fixed list of tiers is
//! tried in order, first success wins:
//!
//! 1. JSON-LD `articleBody` of an `Article`/`NewsArticle` object
//! 2. the publisher's own container selectors for this host
//! 3. `[itemprop="articleBody"]`
//! 4. the first `<article>`
//! 5. common CMS container ids and classes
//!
//! Container tiers strip noise inside the matched element, pull its text,
//! run the host's [`CleanupPolicy`] and only then apply the length check.

use crate::crawler::cleanup::CleanupPolicy;
use crate::crawler::jsonld;
use crate::crawler::noise::{strip_noise, strip_noise_within, NoiseRules};
use crate::crawler::parser::HtmlParser;
use crate::crawler::publishers::{host_of, PublisherProfile};
use crate::crawler::ExtractionRules;
use crate::utils::{char_len, normalize_text};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Fallback selectors for CMS layouts without a publisher profile.
pub const GENERIC_SELECTORS: &[&str] = &[
    "div#articleBodyContents",
    "div#newsEndContents",
    "div.article_body",
    "div#articeBody",
    "div.article",
    "div#content",
    "div#contents",
    ".article-body",
    ".content",
];

const ITEMPROP_SELECTOR: &str = r#"[itemprop="articleBody"]"#;
const ARTICLE_SELECTOR: &str = "article";

/// Paragraphs this short (in chars) or shorter are bullets and captions.
const MIN_PARAGRAPH_CHARS: usize = 3;

/// Which extraction tier produced a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    StructuredData,
    PublisherSelectors,
    ItemProp,
    ArticleElement,
    GenericSelectors,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::StructuredData => "json-ld",
            Tier::PublisherSelectors => "publisher",
            Tier::ItemProp => "itemprop",
            Tier::ArticleElement => "article",
            Tier::GenericSelectors => "generic",
        };
        f.write_str(name)
    }
}

/// A cleaned body and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBody {
    pub text: String,
    pub tier: Tier,
    pub parser: &'static str,
}

/// Parsed page plus what the tiers need to know about it.
struct PageDom<'a> {
    document: Html,
    json_ld: Vec<Map<String, Value>>,
    host: String,
    profile: Option<&'a PublisherProfile>,
    policy: CleanupPolicy,
    noise: &'a NoiseRules,
    min_body_len: usize,
}

type TierFn = fn(&mut PageDom<'_>) -> Option<String>;

const TIERS: &[(Tier, TierFn)] = &[
    (Tier::StructuredData, structured_data),
    (Tier::PublisherSelectors, publisher_selectors),
    (Tier::ItemProp, itemprop_body),
    (Tier::ArticleElement, article_element),
    (Tier::GenericSelectors, generic_selectors),
];

/// Run every tier over one parse of `html`.
///
/// # Arguments
///
/// * `parser` - The parsing capability to build the DOM with
/// * `html` - Decoded page markup
/// * `url` - Where the page came from; selects the publisher profile and cleanup policy
/// * `rules` - Publisher and noise tables
/// * `min_body_len` - A body must be strictly longer than this (chars) after cleanup
pub fn extract_body(
    parser: &dyn HtmlParser,
    html: &str,
    url: &str,
    rules: &ExtractionRules,
    min_body_len: usize,
) -> Option<ExtractedBody> {
    let host = host_of(url);
    let profile = rules.publishers.lookup(&host);
    let policy = profile
        .map(|p| p.cleanup_policy(url))
        .unwrap_or(CleanupPolicy::Standard);

    let mut document = parser.parse(html);
    // Structured data lives in <script>, which the noise sweep removes.
    let json_ld = jsonld::json_ld_objects(&document);
    strip_noise(&mut document, &rules.noise);

    let mut page = PageDom {
        document,
        json_ld,
        host,
        profile,
        policy,
        noise: &rules.noise,
        min_body_len,
    };

    for (tier, run) in TIERS {
        if let Some(text) = run(&mut page) {
            debug!(%tier, parser = parser.name(), chars = char_len(&text), "Body extracted");
            return Some(ExtractedBody {
                text,
                tier: *tier,
                parser: parser.name(),
            });
        }
    }
    debug!(parser = parser.name(), host = %page.host, "No tier produced a body");
    None
}

/// Try each parser in turn; the second only runs when the first finds nothing.
pub fn extract_body_with(
    parsers: &[&dyn HtmlParser],
    html: &str,
    url: &str,
    rules: &ExtractionRules,
    min_body_len: usize,
) -> Option<ExtractedBody> {
    parsers
        .iter()
        .find_map(|parser| extract_body(*parser, html, url, rules, min_body_len))
}

fn structured_data(page: &mut PageDom<'_>) -> Option<String> {
    let raw = jsonld::article_body(&page.json_ld, page.min_body_len)?;
    let text = page.policy.apply(&normalize_text(&raw));
    (char_len(&text) > page.min_body_len).then_some(text)
}

fn publisher_selectors(page: &mut PageDom<'_>) -> Option<String> {
    let selectors = page.profile?.selectors_for(&page.host)?;
    first_container_body(page, selectors)
}

fn itemprop_body(page: &mut PageDom<'_>) -> Option<String> {
    first_container_body(page, &[ITEMPROP_SELECTOR])
}

fn article_element(page: &mut PageDom<'_>) -> Option<String> {
    first_container_body(page, &[ARTICLE_SELECTOR])
}

fn generic_selectors(page: &mut PageDom<'_>) -> Option<String> {
    first_container_body(page, GENERIC_SELECTORS)
}

fn first_container_body(page: &mut PageDom<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel| container_body(page, sel))
}

/// Body from the first element matching `selector`, if long enough.
fn container_body(page: &mut PageDom<'_>, selector: &str) -> Option<String> {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(e) => {
            debug!(selector, error = ?e, "Skipping invalid selector");
            return None;
        }
    };
    let id = page
        .document
        .select(&selector)
        .next()
        .filter(|el| el.text().any(|t| !t.trim().is_empty()))?
        .id();

    strip_noise_within(&mut page.document, id, page.noise);

    let container = page.document.tree.get(id).and_then(ElementRef::wrap)?;
    let raw = container_text(container);
    let text = page.policy.apply(&raw);
    (char_len(&text) > page.min_body_len).then_some(text)
}

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Raw text of a body container.
///
/// Paragraph text (paragraphs over three chars) joined with single spaces
/// when the container has `<p>` children; otherwise the full text with
/// `<br>` turned into line breaks.
pub fn container_text(container: ElementRef<'_>) -> String {
    let paragraphs: Vec<String> = container
        .select(&PARAGRAPH)
        .map(|p| {
            p.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    if !paragraphs.is_empty() {
        return paragraphs
            .into_iter()
            .filter(|p| char_len(p) > MIN_PARAGRAPH_CHARS)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let mut out = String::new();
    for node in container.descendants() {
        match node.value() {
            Node::Text(text) => {
                let piece = text.trim();
                if piece.is_empty() {
                    continue;
                }
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push(' ');
                }
                out.push_str(piece);
            }
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}
