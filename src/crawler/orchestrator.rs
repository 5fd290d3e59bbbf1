//! Decide whether an article needs its body recovered from the live page,
//! and whether what comes back is good enough to replace what we have.
//!
//! One call to [`ArticleCrawler::extract`] is strictly sequential: candidates
//! are fetched one at a time with a randomised pause before each, and the
//! first candidate whose body passes the replacement policy wins. A transport
//! error ends the call on the spot.

use crate::config::{CrawlSettings, DelayRange};
use crate::crawler::candidates::generate_candidates;
use crate::crawler::content::{extract_body_with, ExtractedBody};
use crate::crawler::error::FetchError;
use crate::crawler::fetch::{decode, ExtractedPage, PageFetcher};
use crate::crawler::parser::{HtmlParser, LenientParser, StrictParser};
use crate::crawler::publishers::host_of;
use crate::crawler::title::{extract_title, is_generic_title, title_similarity};
use crate::crawler::truncation::looks_truncated;
use crate::crawler::ExtractionRules;
use crate::utils::{char_len, normalize_text};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

static AMPHTML_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel~="amphtml"][href]"#).unwrap());

/// Where the final body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodySource {
    /// The issue feed's own text.
    #[serde(rename = "kinds")]
    Reference,
    /// Text recovered from the publisher's page.
    #[serde(rename = "fallback")]
    Fallback,
}

/// Best-known body and title for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleCandidate {
    pub body: String,
    pub title: String,
    pub source: BodySource,
}

/// Why no fallback body was produced.
#[derive(Debug)]
pub enum Unresolved {
    /// No URL to fetch.
    MissingUrl,
    /// Every candidate failed to fetch, extract, or beat the reference.
    Exhausted,
    /// A network error ended the attempt.
    Transport(FetchError),
}

/// Result of one [`ArticleCrawler::extract`] call.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// Use this body and title.
    Resolved(ArticleCandidate),
    /// The reference looked truncated and nothing replaced it; the caller
    /// decides whether the reference is still worth keeping.
    Unresolved(Unresolved),
    /// The fetched page's title is only an outlet name and does not match
    /// the reference title: most likely the wrong page. Drop the article.
    Rejected { fallback_title: String, similarity: f64 },
}

/// Body and headline recovered from one page.
#[derive(Debug, Clone)]
struct Fallback {
    body: ExtractedBody,
    title: String,
    url: String,
}

/// True when a fallback body of `fallback_len` chars should replace a
/// reference body of `reference_len` chars.
pub fn replacement_accepted(reference_len: usize, fallback_len: usize, settings: &CrawlSettings) -> bool {
    fallback_len > reference_len
        || (reference_len <= settings.short_reference_len
            && fallback_len >= settings.long_fallback_len)
}

/// Runs the fallback crawl for one article at a time.
///
/// Holds only shared references: the fetcher, the read-only publisher and
/// noise tables, and settings. Extraction state lives inside each call, so
/// one crawler can serve several concurrent `extract` calls.
pub struct ArticleCrawler<'a, F> {
    fetcher: &'a F,
    rules: &'a ExtractionRules,
    settings: &'a CrawlSettings,
}

impl<'a, F: PageFetcher> ArticleCrawler<'a, F> {
    pub fn new(fetcher: &'a F, rules: &'a ExtractionRules, settings: &'a CrawlSettings) -> Self {
        Self {
            fetcher,
            rules,
            settings,
        }
    }

    /// Produce the final body and title for one article.
    ///
    /// # Arguments
    ///
    /// * `url` - The article's canonical URL
    /// * `reference_title` - Title from the issue feed
    /// * `reference_body` - Body from the issue feed, possibly cut short
    /// * `provider` - Outlet name from the issue feed, used to spot outlet-name titles
    ///
    /// # Returns
    ///
    /// The reference untouched when it does not look truncated, otherwise
    /// the outcome of the candidate crawl. Never panics on network trouble.
    #[instrument(level = "info", skip_all, fields(%url, %provider))]
    pub async fn extract(
        &self,
        url: &str,
        reference_title: &str,
        reference_body: &str,
        provider: &str,
    ) -> ExtractionOutcome {
        let s = self.settings;
        if !looks_truncated(reference_body, s.min_reasonable_len, s.tail_window) {
            debug!(chars = char_len(reference_body), "Reference body looks complete");
            return ExtractionOutcome::Resolved(ArticleCandidate {
                body: reference_body.to_string(),
                title: reference_title.to_string(),
                source: BodySource::Reference,
            });
        }
        if url.trim().is_empty() {
            return ExtractionOutcome::Unresolved(Unresolved::MissingUrl);
        }

        info!(
            chars = char_len(reference_body),
            "Reference body looks truncated; trying the live page"
        );
        let fallback = match self.find_fallback(url, reference_body).await {
            Ok(Some(fallback)) => fallback,
            Ok(None) => {
                info!("No candidate produced an acceptable body");
                return ExtractionOutcome::Unresolved(Unresolved::Exhausted);
            }
            Err(e) => {
                warn!(error = %e, "Network error; giving up on this article");
                return ExtractionOutcome::Unresolved(Unresolved::Transport(e));
            }
        };
        self.decide_title(reference_title, provider, fallback)
    }

    /// Walk the candidates until one yields a body that beats the reference.
    async fn find_fallback(
        &self,
        url: &str,
        reference_body: &str,
    ) -> Result<Option<Fallback>, FetchError> {
        let reference_len = char_len(reference_body);
        for candidate in generate_candidates(url, &self.rules.publishers) {
            pause(self.settings.primary_delay).await;
            let Some(page) = self.fetch_page(&candidate.url).await? else {
                continue;
            };

            let found = match self.extract_page(&page, &candidate.url) {
                Some(found) => Some(found),
                None => self.follow_amp_link(&page, &candidate.url).await?,
            };
            let Some(found) = found else {
                debug!(url = %candidate.url, "No body on candidate");
                continue;
            };

            let fallback_len = char_len(&found.body.text);
            if replacement_accepted(reference_len, fallback_len, self.settings) {
                info!(
                    url = %found.url,
                    rank = candidate.origin_rank,
                    tier = %found.body.tier,
                    parser = found.body.parser,
                    charset = %page.charset_used,
                    reference_len,
                    fallback_len,
                    "Fallback body accepted"
                );
                return Ok(Some(found));
            }
            info!(
                url = %found.url,
                reference_len,
                fallback_len,
                "Fallback body not better than reference; trying next candidate"
            );
        }
        Ok(None)
    }

    /// GET and decode one URL. `Ok(None)` for a non-200, an empty body or
    /// a known "not found" page.
    async fn fetch_page(&self, url: &str) -> Result<Option<ExtractedPage>, FetchError> {
        let resp = self.fetcher.get(url).await?;
        if !resp.is_usable() {
            debug!(%url, status = resp.status, bytes = resp.body.len(), "Candidate unusable");
            return Ok(None);
        }

        let decoded = decode(
            &resp.body,
            resp.content_type.as_deref(),
            &self.settings.fallback_charsets,
        );
        let host = host_of(url);
        if self
            .rules
            .publishers
            .lookup(&host)
            .is_some_and(|p| p.is_not_found_page(&decoded.text))
        {
            info!(%url, "Page-not-found body served with 200; skipping");
            return Ok(None);
        }
        Ok(Some(ExtractedPage {
            raw_html: decoded.text,
            charset_used: decoded.charset,
            host,
        }))
    }

    /// Body (strict parse, then lenient) and headline for one decoded page.
    fn extract_page(&self, page: &ExtractedPage, url: &str) -> Option<Fallback> {
        let parsers: [&dyn HtmlParser; 2] = [&StrictParser, &LenientParser];
        let mut body = extract_body_with(
            &parsers,
            &page.raw_html,
            url,
            self.rules,
            self.settings.min_body_len,
        )?;
        body.text = normalize_text(&body.text);
        Some(Fallback {
            body,
            title: extract_title(&page.raw_html),
            url: url.to_string(),
        })
    }

    /// Try the page's `<link rel="amphtml">` once.
    async fn follow_amp_link(
        &self,
        page: &ExtractedPage,
        page_url: &str,
    ) -> Result<Option<Fallback>, FetchError> {
        let Some(amp_url) = amp_link(&page.raw_html, page_url) else {
            return Ok(None);
        };
        if amp_url == page_url {
            return Ok(None);
        }
        info!(from = %page_url, to = %amp_url, host = %page.host, "Following amphtml link");
        pause(self.settings.amp_follow_delay).await;
        let Some(amp_page) = self.fetch_page(&amp_url).await? else {
            return Ok(None);
        };
        Ok(self.extract_page(&amp_page, &amp_url))
    }

    fn decide_title(
        &self,
        reference_title: &str,
        provider: &str,
        fallback: Fallback,
    ) -> ExtractionOutcome {
        let similarity = title_similarity(reference_title, &fallback.title);
        let threshold = self.settings.title_similarity_threshold;
        let generic = is_generic_title(&fallback.title, provider);

        if similarity < threshold && generic {
            warn!(
                similarity,
                fallback_title = %fallback.title,
                "Fallback title is only an outlet name and does not match; rejecting article"
            );
            return ExtractionOutcome::Rejected {
                fallback_title: fallback.title,
                similarity,
            };
        }

        let title = if similarity < threshold && !fallback.title.is_empty() {
            info!(
                similarity,
                reference_title = %reference_title,
                fallback_title = %fallback.title,
                "Adopting the page's title"
            );
            fallback.title
        } else {
            reference_title.to_string()
        };
        ExtractionOutcome::Resolved(ArticleCandidate {
            body: fallback.body.text,
            title,
            source: BodySource::Fallback,
        })
    }
}

/// Absolute URL of the page's AMP alternate, if it declares one.
pub fn amp_link(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let href = document
        .select(&AMPHTML_LINK)
        .filter_map(|l| l.value().attr("href"))
        .map(str::trim)
        .find(|h| !h.is_empty())?;
    let base = Url::parse(page_url).ok()?;
    base.join(href).ok().map(String::from)
}

async fn pause(range: DelayRange) {
    let delay = range.sample();
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetch::RawResponse;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Scripted {
        Page(u16, String),
        Down,
    }

    /// In-memory fetcher that records every requested URL.
    #[derive(Default)]
    struct ScriptedFetcher {
        pages: HashMap<String, Scripted>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn page(mut self, url: &str, html: String) -> Self {
            self.pages.insert(url.to_string(), Scripted::Page(200, html));
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.pages
                .insert(url.to_string(), Scripted::Page(status, String::new()));
            self
        }

        fn down(mut self, url: &str) -> Self {
            self.pages.insert(url.to_string(), Scripted::Down);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PageFetcher for ScriptedFetcher {
        async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Scripted::Page(status, html)) => Ok(RawResponse {
                    status: *status,
                    content_type: Some("text/html; charset=utf-8".to_string()),
                    body: html.clone().into_bytes(),
                }),
                Some(Scripted::Down) => Err(FetchError::Timeout {
                    url: url.to_string(),
                }),
                None => Ok(RawResponse {
                    status: 404,
                    content_type: None,
                    body: Vec::new(),
                }),
            }
        }
    }

    fn quiet_settings() -> CrawlSettings {
        CrawlSettings {
            primary_delay: DelayRange::ZERO,
            amp_follow_delay: DelayRange::ZERO,
            ..CrawlSettings::default()
        }
    }

    /// Article page whose cleaned body is exactly `chars` long.
    fn article_page(title: &str, chars: usize) -> String {
        let body = "가".repeat(chars - 1) + ".";
        format!(
            "<html><head><title>{title}</title></head><body><h1>{title}</h1><article><p>{body}</p></article></body></html>"
        )
    }

    const URL: &str = "https://example.com/news/1";

    #[tokio::test]
    async fn test_short_reference_replaced_by_longer_fallback() {
        let fetcher = ScriptedFetcher::default().page(URL, article_page("국회 예산안 통과", 450));
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let reference = "가".repeat(200);
        let outcome = crawler.extract(URL, "국회 예산안 통과", &reference, "SBS").await;
        let ExtractionOutcome::Resolved(article) = outcome else {
            panic!("expected a resolved article");
        };
        assert_eq!(article.source, BodySource::Fallback);
        assert_eq!(char_len(&article.body), 450);
        assert_eq!(article.title, "국회 예산안 통과");
    }

    #[tokio::test]
    async fn test_complete_reference_needs_no_fetch() {
        let fetcher = ScriptedFetcher::default();
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let reference = "가".repeat(899) + ".";
        let outcome = crawler.extract(URL, "제목", &reference, "SBS").await;
        let ExtractionOutcome::Resolved(article) = outcome else {
            panic!("expected the reference back");
        };
        assert_eq!(article.source, BodySource::Reference);
        assert_eq!(article.body, reference);
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_generic_mismatched_title_rejects_article() {
        let page = article_page("조선일보", 450);
        let fetcher = ScriptedFetcher::default().page(URL, page);
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        // one shared token out of ten
        let reference_title = "조선일보 하나 둘 셋 넷 다섯 여섯 일곱 여덟 아홉";
        let outcome = crawler
            .extract(URL, reference_title, &"가".repeat(200), "조선일보")
            .await;
        match outcome {
            ExtractionOutcome::Rejected {
                fallback_title,
                similarity,
            } => {
                assert_eq!(fallback_title, "조선일보");
                assert!((similarity - 0.1).abs() < 1e-9);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dissimilar_specific_title_is_adopted() {
        let fetcher =
            ScriptedFetcher::default().page(URL, article_page("전혀 다른 구체적 기사 제목", 450));
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let outcome = crawler.extract(URL, "오래된 제목", &"가".repeat(200), "SBS").await;
        let ExtractionOutcome::Resolved(article) = outcome else {
            panic!("expected a resolved article");
        };
        assert_eq!(article.title, "전혀 다른 구체적 기사 제목");
    }

    #[tokio::test]
    async fn test_transport_error_aborts_remaining_candidates() {
        let url = "https://www.khan.co.kr/article/202502061030001";
        let fetcher = ScriptedFetcher::default()
            .down(url)
            .page(
                "https://www.khan.co.kr/article/202502061030001/amp",
                article_page("제목입니다", 450),
            );
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let outcome = crawler.extract(url, "제목입니다", "짧은 본문", "경향신문").await;
        assert!(matches!(
            outcome,
            ExtractionOutcome::Unresolved(Unresolved::Transport(FetchError::Timeout { .. }))
        ));
        assert_eq!(fetcher.requested(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn test_non_200_moves_to_next_candidate() {
        let url = "https://www.khan.co.kr/article/202502061030001";
        let amp = "https://www.khan.co.kr/article/202502061030001/amp";
        let fetcher = ScriptedFetcher::default()
            .status(url, 403)
            .page(amp, article_page("경향 기사 제목", 450));
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let outcome = crawler.extract(url, "경향 기사 제목", "짧은 본문", "경향신문").await;
        assert!(matches!(outcome, ExtractionOutcome::Resolved(_)));
        assert_eq!(fetcher.requested(), vec![url.to_string(), amp.to_string()]);
    }

    #[tokio::test]
    async fn test_amphtml_link_is_followed_once() {
        let shell = r#"<html><head><link rel="amphtml" href="/news/1/amp"></head><body><p>로딩 중</p></body></html>"#;
        let fetcher = ScriptedFetcher::default()
            .page(URL, shell.to_string())
            .page("https://example.com/news/1/amp", article_page("앰프 기사", 450));
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let outcome = crawler.extract(URL, "앰프 기사", "짧은 본문", "SBS").await;
        assert!(matches!(outcome, ExtractionOutcome::Resolved(_)));
        assert_eq!(
            fetcher.requested(),
            vec![URL.to_string(), "https://example.com/news/1/amp".to_string()]
        );
    }

    #[tokio::test]
    async fn test_shorter_fallback_keeps_looking_then_exhausts() {
        let fetcher = ScriptedFetcher::default().page(URL, article_page("제목입니다", 300));
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        // 600 chars, no sentence ending: truncated, and longer than the fallback
        let reference = "가".repeat(600);
        let outcome = crawler.extract(URL, "제목입니다", &reference, "SBS").await;
        assert!(matches!(
            outcome,
            ExtractionOutcome::Unresolved(Unresolved::Exhausted)
        ));
    }

    #[tokio::test]
    async fn test_short_first_body_moves_on_to_longer_candidate() {
        let url = "https://www.khan.co.kr/article/1";
        let amp = "https://www.khan.co.kr/article/1/amp";
        let fetcher = ScriptedFetcher::default()
            .page(url, article_page("경향 기사 제목", 300))
            .page(amp, article_page("경향 기사 제목", 700));
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let reference = "가".repeat(500);
        let outcome = crawler.extract(url, "경향 기사 제목", &reference, "경향신문").await;
        let ExtractionOutcome::Resolved(article) = outcome else {
            panic!("expected the second candidate to win");
        };
        assert_eq!(article.source, BodySource::Fallback);
        assert_eq!(char_len(&article.body), 700);
        assert_eq!(fetcher.requested(), vec![url.to_string(), amp.to_string()]);
    }

    #[tokio::test]
    async fn test_amp_follow_timeout_aborts_call() {
        let url = "https://www.khan.co.kr/article/1";
        let shell = r#"<html><head><link rel="amphtml" href="https://amp.example.com/x"></head><body><p>로딩 중</p></body></html>"#;
        let fetcher = ScriptedFetcher::default()
            .page(url, shell.to_string())
            .down("https://amp.example.com/x")
            .page("https://www.khan.co.kr/article/1/amp", article_page("경향 기사 제목", 450));
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let outcome = crawler.extract(url, "경향 기사 제목", "짧은 본문", "경향신문").await;
        match outcome {
            ExtractionOutcome::Unresolved(Unresolved::Transport(FetchError::Timeout { url })) => {
                assert_eq!(url, "https://amp.example.com/x");
            }
            other => panic!("expected a transport failure, got {other:?}"),
        }
        assert_eq!(
            fetcher.requested(),
            vec![url.to_string(), "https://amp.example.com/x".to_string()]
        );
    }

    #[tokio::test]
    async fn test_not_found_page_is_skipped() {
        let url = "https://imnews.imbc.com/news/2025/politics/article/6682000_36711.html";
        let page = format!(
            "<html><body><p>요청하신 페이지를 찾을 수 없습니다</p>{}</body></html>",
            article_page("엠비씨 기사", 450)
        );
        let fetcher = ScriptedFetcher::default().page(url, page);
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

        let outcome = crawler.extract(url, "엠비씨 기사", "짧은 본문", "MBC").await;
        assert!(matches!(
            outcome,
            ExtractionOutcome::Unresolved(Unresolved::Exhausted)
        ));
    }

    #[tokio::test]
    async fn test_missing_url() {
        let fetcher = ScriptedFetcher::default();
        let rules = ExtractionRules::default();
        let settings = quiet_settings();
        let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);
        let outcome = crawler.extract("  ", "제목", "짧은 본문", "SBS").await;
        assert!(matches!(
            outcome,
            ExtractionOutcome::Unresolved(Unresolved::MissingUrl)
        ));
    }

    #[test]
    fn test_replacement_policy_branches() {
        let s = CrawlSettings::default();
        assert!(replacement_accepted(200, 450, &s));
        assert!(replacement_accepted(600, 601, &s));
        assert!(!replacement_accepted(600, 600, &s));
        assert!(!replacement_accepted(300, 250, &s));
    }

    #[test]
    fn test_amp_link_resolution() {
        let html = r#"<html><head><link rel="canonical amphtml" href="amp/1"></head></html>"#;
        assert_eq!(
            amp_link(html, "https://example.com/news/"),
            Some("https://example.com/news/amp/1".to_string())
        );
        assert_eq!(amp_link("<html></html>", "https://example.com/"), None);
    }
}
