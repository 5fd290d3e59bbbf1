//! HTTP retrieval of article pages and byte-to-text decoding.
//!
//! The network sits behind [`PageFetcher`] so the orchestrator can run
//! against a scripted fetcher in tests. [`HttpFetcher`] is the real one: a
//! single reqwest client with a desktop browser user agent and a Korean
//! `Accept-Language`.
//!
//! Decoding never fails. Korean publishers still serve EUC-KR/CP949 pages,
//! often without declaring it, so the decoder walks a fixed order:
//!
//! 1. charset from the `Content-Type` header (lossy)
//! 2. BOM, `<meta charset>` / `http-equiv`, or valid UTF-8
//! 3. each fallback charset, strictly
//! 4. UTF-8 with replacement characters

use crate::crawler::error::FetchError;
use crate::utils::truncate_for_log;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
pub const KOREAN_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8";

/// Default charsets tried, in order, when nothing declares one.
pub const DEFAULT_FALLBACK_CHARSETS: &[&str] = &["utf-8", "euc-kr", "windows-949", "iso-8859-1"];

/// How far into the document to look for a `<meta>` charset.
const META_SNIFF_BYTES: usize = 4096;

static HEADER_CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_.:\-]+)"#).unwrap());
static META_CHARSET_RE: Lazy<BytesRegex> = Lazy::new(|| {
    BytesRegex::new(r#"(?i-u)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_.:\-]+)"#).unwrap()
});

/// Status, declared content type and raw body of one GET.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// A usable page: HTTP 200 with a non-empty body.
    pub fn is_usable(&self) -> bool {
        self.status == 200 && !self.body.is_empty()
    }
}

/// Decoded page content owned by one extraction attempt.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub raw_html: String,
    pub charset_used: String,
    pub host: String,
}

/// The network boundary for article pages.
///
/// Non-200 statuses are not errors; they come back in [`RawResponse::status`].
/// Only transport failures are `Err`.
pub trait PageFetcher {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError>;
}

/// reqwest-backed [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client with the browser headers and a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(KOREAN_ACCEPT_LANGUAGE),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?
            .to_vec();
        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            content_type = content_type.as_deref().unwrap_or(""),
            "GET finished"
        );
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Text plus the name of the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub charset: String,
}

/// Decode a response body. Never fails; the worst case is lossy UTF-8.
///
/// # Arguments
///
/// * `bytes` - Raw body
/// * `content_type` - The `Content-Type` header, if any
/// * `fallbacks` - Charset labels tried strictly, in order, when nothing is declared or sniffed
pub fn decode(bytes: &[u8], content_type: Option<&str>, fallbacks: &[String]) -> DecodedText {
    if let Some(encoding) = content_type.and_then(header_encoding) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            debug!(charset = encoding.name(), "Declared charset produced replacement characters");
        }
        return DecodedText {
            text: text.into_owned(),
            charset: encoding.name().to_string(),
        };
    }

    if let Some(encoding) = sniff_encoding(bytes) {
        let (text, _, _) = encoding.decode(bytes);
        return DecodedText {
            text: text.into_owned(),
            charset: encoding.name().to_string(),
        };
    }

    for label in fallbacks {
        let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) else {
            warn!(label = %label, "Unknown fallback charset label");
            continue;
        };
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return DecodedText {
                text: text.into_owned(),
                charset: encoding.name().to_string(),
            };
        }
    }

    warn!(
        preview = %truncate_for_log(&String::from_utf8_lossy(bytes), 80),
        "No charset decoded cleanly; using lossy UTF-8"
    );
    DecodedText {
        text: String::from_utf8_lossy(bytes).into_owned(),
        charset: UTF_8.name().to_string(),
    }
}

fn header_encoding(content_type: &str) -> Option<&'static Encoding> {
    let label = HEADER_CHARSET_RE.captures(content_type)?.get(1)?.as_str();
    Encoding::for_label(label.as_bytes())
}

/// Byte-level charset detection: BOM, then `<meta>`, then valid UTF-8.
fn sniff_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Some(encoding);
    }
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    if let Some(encoding) = META_CHARSET_RE
        .captures(head)
        .and_then(|c| c.get(1))
        .and_then(|m| Encoding::for_label(m.as_bytes()))
    {
        return Some(encoding);
    }
    std::str::from_utf8(bytes).is_ok().then_some(UTF_8)
}
