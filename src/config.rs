//! Tunable thresholds and pacing for the crawl, loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock behaviour. A partial file overrides only the keys it names:
//!
//! ```yaml
//! request_timeout_secs: 20
//! primary_delay: { min_secs: 1.0, max_secs: 2.0 }
//! provider_filter: [SBS, KBS]
//! ```

use crate::crawler::fetch::DEFAULT_FALLBACK_CHARSETS;
use crate::crawler::noise::LINK_DENSITY_LIMIT;
use rand::{rng, Rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// A uniformly random pause between `min_secs` and `max_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange {
        min_secs: 0.0,
        max_secs: 0.0,
    };

    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Draw one delay. Negative bounds count as zero; a reversed range is
    /// treated as its lower bound.
    pub fn sample(&self) -> Duration {
        let lo = self.min_secs.max(0.0);
        let hi = self.max_secs.max(0.0);
        let secs = if hi > lo {
            rng().random_range(lo..=hi)
        } else {
            lo
        };
        Duration::from_secs_f64(secs)
    }
}

/// Settings for the issue collection and article crawl stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Pause before each candidate URL.
    pub primary_delay: DelayRange,
    /// Pause before following a page's `amphtml` link.
    pub amp_follow_delay: DelayRange,

    /// Reference bodies shorter than this are considered truncated.
    pub min_reasonable_len: usize,
    /// How many trailing chars are searched for a sentence ending.
    pub tail_window: usize,
    /// A fallback body must be strictly longer than this after cleanup.
    pub min_body_len: usize,
    /// Containers whose anchor text share is strictly above this are dropped.
    pub link_density_limit: f64,

    /// Reference bodies at or below this length accept any fallback of
    /// `long_fallback_len` or more.
    pub short_reference_len: usize,
    pub long_fallback_len: usize,
    /// Below this Jaccard score the reference and fallback titles disagree.
    pub title_similarity_threshold: f64,
    /// Without a usable fallback, keep the reference only above this length.
    pub min_len_to_keep_without_fallback: usize,

    /// Charset labels tried strictly, in order, when a page declares none.
    pub fallback_charsets: Vec<String>,
    /// Providers whose articles are crawled; everything else is skipped.
    /// Leave empty to crawl every provider.
    pub provider_filter: Vec<String>,
    /// How many articles are extracted at once.
    pub article_concurrency: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            primary_delay: DelayRange::new(0.6, 1.2),
            amp_follow_delay: DelayRange::new(0.5, 1.0),
            min_reasonable_len: 800,
            tail_window: 40,
            min_body_len: 180,
            link_density_limit: LINK_DENSITY_LIMIT,
            short_reference_len: 250,
            long_fallback_len: 400,
            title_similarity_threshold: 0.35,
            min_len_to_keep_without_fallback: 500,
            fallback_charsets: DEFAULT_FALLBACK_CHARSETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            provider_filter: [
                "MBC", "KBS", "SBS", "국민일보", "조선일보", "중앙일보", "동아일보", "한겨레",
                "경향신문",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            article_concurrency: 1,
        }
    }
}

impl CrawlSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// True when `provider` is in the filter (whitespace-insensitive).
    /// An empty filter accepts every provider.
    pub fn accepts_provider(&self, provider: &str) -> bool {
        if self.provider_filter.is_empty() {
            return true;
        }
        let squeeze = |s: &str| s.split_whitespace().collect::<String>();
        let provider = squeeze(provider);
        self.provider_filter.iter().any(|p| squeeze(p) == provider)
    }

    /// Parse settings from YAML text; missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

/// Load settings from `path`, or the defaults when no path is given.
#[instrument(level = "info", skip_all, fields(path = path.unwrap_or("<defaults>")))]
pub async fn load_settings(path: Option<&str>) -> Result<CrawlSettings, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(CrawlSettings::default());
    };
    let text = fs::read_to_string(path).await?;
    let settings = CrawlSettings::from_yaml(&text)?;
    info!(
        timeout_secs = settings.request_timeout_secs,
        providers = settings.provider_filter.len(),
        concurrency = settings.article_concurrency,
        "Loaded crawl settings"
    );
    Ok(settings)
}
