//! Issue source API interaction with exponential backoff retry logic.
//!
//! This module talks to the KINDS news analysis tools API: the daily issue
//! ranking and the per-article detail search. Both are JSON POSTs carrying
//! an access key.
//!
//! # Architecture
//!
//! - [`KindsRequest`]: Core trait defining one async JSON request
//! - [`KindsHttp`]: reqwest implementation
//! - [`RetryRequest`]: Decorator that adds retry logic to any `KindsRequest`
//! - [`KindsClient`]: The two typed calls on top of any `KindsRequest`
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Only transport failures and 5xx/429 statuses are retried
//!
//! Article pages are never retried this way; see the crawler.

use crate::models::{IssueDigest, NewsDocument, DETAIL_FIELDS};
use crate::utils::truncate_for_log;
use rand::{rng, Rng};
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

pub const ISSUE_RANKING_URL: &str = "https://tools.kinds.or.kr/issue_ranking";
pub const NEWS_SEARCH_URL: &str = "https://tools.kinds.or.kr/search/news";

/// Failure talking to the issue source.
#[derive(Debug, Error)]
pub enum KindsError {
    #[error("no KINDS access key configured")]
    MissingAccessKey,

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("KINDS API error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl KindsError {
    /// Worth another attempt: network trouble, throttling or a server error.
    pub fn is_transient(&self) -> bool {
        match self {
            KindsError::Transport { .. } => true,
            KindsError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Trait for one JSON request to the issue source.
pub trait KindsRequest {
    /// POST `payload` to `endpoint` and return the decoded JSON body.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Absolute API URL
    /// * `payload` - Request body, access key included
    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, KindsError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`KindsRequest`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryRequest<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryRequest<T>
where
    T: KindsRequest,
{
    /// Create a new retry wrapper around an existing [`KindsRequest`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying client to wrap
    /// * `max_retries` - Maximum number of retry attempts (5 recommended)
    /// * `base_delay` - Initial delay between retries (1 second recommended)
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRequest")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> KindsRequest for RetryRequest<T>
where
    T: KindsRequest,
{
    #[instrument(level = "info", skip_all, fields(%endpoint))]
    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, KindsError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.post(endpoint, payload).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "post() giving up"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "post() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// reqwest implementation of [`KindsRequest`].
#[derive(Debug, Clone)]
pub struct KindsHttp {
    client: reqwest::Client,
}

impl KindsHttp {
    pub fn new(timeout: StdDuration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl KindsRequest for KindsHttp {
    #[instrument(level = "info", skip_all, fields(%endpoint))]
    async fn post(&self, endpoint: &str, payload: &Value) -> Result<Value, KindsError> {
        let t0 = Instant::now();
        let transport = |source| KindsError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };
        let resp = self
            .client
            .post(endpoint)
            .header("Accept", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u128, "API call failed");
            return Err(KindsError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let text = resp.text().await.map_err(transport)?;
        let value: Value = serde_json::from_str(&text).inspect_err(|e| {
            warn!(error = %e, body = %truncate_for_log(&text, 300), "Response is not JSON");
        })?;
        Ok(value)
    }
}

/// Typed calls against the issue source.
#[derive(Debug)]
pub struct KindsClient<T> {
    inner: T,
    access_key: String,
}

impl KindsClient<RetryRequest<KindsHttp>> {
    /// HTTP client with the standard retry policy.
    pub fn with_backoff(access_key: &str, timeout: StdDuration) -> Result<Self, KindsError> {
        let http = KindsHttp::new(timeout).map_err(|source| KindsError::Transport {
            endpoint: "<client>".to_string(),
            source,
        })?;
        Self::new(RetryRequest::new(http, 5, StdDuration::from_secs(1)), access_key)
    }
}

impl<T: KindsRequest> KindsClient<T> {
    pub fn new(inner: T, access_key: &str) -> Result<Self, KindsError> {
        let access_key = access_key.trim();
        if access_key.is_empty() {
            return Err(KindsError::MissingAccessKey);
        }
        Ok(Self {
            inner,
            access_key: access_key.to_string(),
        })
    }

    async fn call(&self, endpoint: &str, argument: Value) -> Result<Value, KindsError> {
        let payload = json!({ "access_key": self.access_key, "argument": argument });
        let data = self.inner.post(endpoint, &payload).await?;
        if let Some(err) = data.get("error").filter(|e| !is_blank(e)) {
            let message = match err {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(KindsError::Api(message));
        }
        Ok(data)
    }

    /// The day's ranked issues for the given providers.
    ///
    /// # Arguments
    ///
    /// * `date` - `YYYY-MM-DD`
    /// * `providers` - Outlet names to rank over
    #[instrument(level = "info", skip_all, fields(%date, providers = providers.len()))]
    pub async fn issue_ranking(
        &self,
        date: &str,
        providers: &[String],
    ) -> Result<IssueDigest, KindsError> {
        let t0 = Instant::now();
        let data = self
            .call(
                ISSUE_RANKING_URL,
                json!({ "date": date, "provider": providers }),
            )
            .await?;
        let digest = IssueDigest::from_response(&data, date);
        info!(
            topics = digest.topics.len(),
            elapsed_ms = t0.elapsed().as_millis() as u128,
            "Fetched issue ranking"
        );
        Ok(digest)
    }

    /// Detail records for `news_ids`, in whatever order the API returns them.
    #[instrument(level = "info", skip_all, fields(ids = news_ids.len()))]
    pub async fn news_detail(&self, news_ids: &[String]) -> Result<Vec<NewsDocument>, KindsError> {
        if news_ids.is_empty() {
            return Ok(Vec::new());
        }
        let data = self
            .call(
                NEWS_SEARCH_URL,
                json!({ "news_ids": news_ids, "fields": DETAIL_FIELDS }),
            )
            .await?;
        let documents = data
            .get("return_object")
            .and_then(|ro| ro.get("documents"))
            .or_else(|| data.get("documents"))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        let documents: Vec<NewsDocument> = match documents {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed news document");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        info!(count = documents.len(), "Fetched news details");
        Ok(documents)
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}
