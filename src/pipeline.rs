//! Stage drivers: collect the day's issues, then crawl their articles.
//!
//! Failures here degrade to "skip this topic" or "skip this article"; only
//! the issue ranking call itself can fail a stage.

use crate::api::{KindsClient, KindsError, KindsRequest};
use crate::config::CrawlSettings;
use crate::crawler::fetch::PageFetcher;
use crate::crawler::orchestrator::{ArticleCrawler, BodySource, ExtractionOutcome, Unresolved};
use crate::models::{ArticleRecord, IssueDigest, NewsDocument};
use crate::utils::{char_len, clean_date, normalize_text, truncate_for_log};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

/// Fetch the issue ranking for `date` and keep the top `max_topics`.
#[instrument(level = "info", skip_all, fields(%date, max_topics))]
pub async fn collect_issues<T: KindsRequest>(
    client: &KindsClient<T>,
    date: &str,
    providers: &[String],
    max_topics: usize,
) -> Result<IssueDigest, KindsError> {
    let mut digest = client.issue_ranking(date, providers).await?;
    digest.truncate_topics(max_topics);
    info!(topics = digest.topics.len(), "Collected issues");
    Ok(digest)
}

/// One article waiting to be crawled.
#[derive(Debug, Clone)]
struct ArticleJob {
    topic: String,
    topic_rank: Option<i64>,
    doc: NewsDocument,
}

/// Crawl the first `per_topic_docs` articles of every topic.
///
/// # Arguments
///
/// * `client` - Issue source client for the detail lookups
/// * `crawler` - Fallback crawler for truncated bodies
/// * `settings` - Provider filter, keep threshold and concurrency
/// * `digest` - Output of [`collect_issues`]
/// * `per_topic_docs` - How many news ids to take from each topic's cluster
///
/// # Returns
///
/// Records in topic order, then cluster order. Skipped articles are logged.
#[instrument(level = "info", skip_all, fields(topics = digest.topics.len(), per_topic_docs))]
pub async fn crawl_articles<T: KindsRequest, F: PageFetcher>(
    client: &KindsClient<T>,
    crawler: &ArticleCrawler<'_, F>,
    settings: &CrawlSettings,
    digest: &IssueDigest,
    per_topic_docs: usize,
) -> Vec<ArticleRecord> {
    let mut jobs = Vec::new();
    for topic in &digest.topics {
        let cluster: Vec<String> = topic.news_cluster.iter().take(per_topic_docs).cloned().collect();
        if cluster.is_empty() {
            continue;
        }
        let docs = match client.news_detail(&cluster).await {
            Ok(docs) => docs,
            Err(e) => {
                error!(topic = %topic.topic, error = %e, "Detail lookup failed; skipping topic");
                continue;
            }
        };
        for doc in docs {
            if !settings.accepts_provider(doc.provider()) {
                info!(provider = doc.provider(), topic = %topic.topic, "Provider not in filter; skipping");
                continue;
            }
            jobs.push(ArticleJob {
                topic: topic.topic.clone(),
                topic_rank: topic.topic_rank,
                doc,
            });
        }
    }

    let total = jobs.len();
    let concurrency = settings.article_concurrency.max(1);
    info!(total, concurrency, "Crawling articles");

    let records: Vec<ArticleRecord> = stream::iter(jobs)
        .map(|job| crawl_one(crawler, settings, job))
        .buffered(concurrency)
        .filter_map(|r| std::future::ready(r))
        .collect()
        .await;

    info!(
        total,
        kept = records.len(),
        fallback = records.iter().filter(|r| r.source == BodySource::Fallback).count(),
        "Finished crawling articles"
    );
    records
}

async fn crawl_one<F: PageFetcher>(
    crawler: &ArticleCrawler<'_, F>,
    settings: &CrawlSettings,
    job: ArticleJob,
) -> Option<ArticleRecord> {
    let doc = &job.doc;
    let provider = doc.provider();
    let reference_title = doc.title();
    let reference_body = normalize_text(doc.reference_body());
    let url = doc.article_url().unwrap_or_default();

    let outcome = crawler
        .extract(url, reference_title, &reference_body, provider)
        .await;

    let (title, content, source) = match outcome {
        ExtractionOutcome::Resolved(article) => (article.title, article.body, article.source),
        ExtractionOutcome::Rejected {
            fallback_title,
            similarity,
        } => {
            warn!(
                %provider,
                %reference_title,
                %fallback_title,
                similarity,
                "Title mismatch with outlet-name page title; skipping article"
            );
            return None;
        }
        ExtractionOutcome::Unresolved(reason) => {
            let len = char_len(&reference_body);
            if len <= settings.min_len_to_keep_without_fallback {
                warn!(
                    %provider,
                    %reference_title,
                    len,
                    reason = reason_label(&reason),
                    "No fallback and reference body too short; skipping article"
                );
                return None;
            }
            info!(len, reason = reason_label(&reason), "Keeping reference body without fallback");
            (reference_title.to_string(), reference_body, BodySource::Reference)
        }
    };

    info!(
        topic = %job.topic,
        title = %truncate_for_log(&title, 30),
        %provider,
        ?source,
        "Article ready"
    );
    Some(ArticleRecord {
        topic: job.topic.clone(),
        topic_rank: job.topic_rank,
        news_id: doc.news_id.clone().unwrap_or_default(),
        title,
        provider: provider.to_string(),
        category: doc.category(),
        published_at: clean_date(doc.published_at.as_deref().unwrap_or_default()),
        url: url.to_string(),
        content,
        source,
    })
}

fn reason_label(reason: &Unresolved) -> &'static str {
    match reason {
        Unresolved::MissingUrl => "missing_url",
        Unresolved::Exhausted => "exhausted",
        Unresolved::Transport(_) => "transport",
    }
}

/// Result of a one-off extraction, printed as JSON.
#[derive(Debug, Serialize)]
pub struct SingleExtraction {
    pub url: String,
    /// `resolved`, `unresolved` or `rejected`.
    pub outcome: &'static str,
    pub source: Option<BodySource>,
    pub title: String,
    pub content: String,
    pub chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Run the fallback crawl for one URL outside the issue pipeline.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn extract_single<F: PageFetcher>(
    crawler: &ArticleCrawler<'_, F>,
    url: &str,
    reference_title: &str,
    reference_body: &str,
    provider: &str,
) -> SingleExtraction {
    let reference_body = normalize_text(reference_body);
    match crawler
        .extract(url, reference_title, &reference_body, provider)
        .await
    {
        ExtractionOutcome::Resolved(article) => SingleExtraction {
            url: url.to_string(),
            outcome: "resolved",
            source: Some(article.source),
            chars: char_len(&article.body),
            title: article.title,
            content: article.body,
            detail: None,
        },
        ExtractionOutcome::Rejected {
            fallback_title,
            similarity,
        } => SingleExtraction {
            url: url.to_string(),
            outcome: "rejected",
            source: None,
            title: fallback_title,
            content: String::new(),
            chars: 0,
            detail: Some(format!("title similarity {similarity:.2}")),
        },
        ExtractionOutcome::Unresolved(reason) => SingleExtraction {
            url: url.to_string(),
            outcome: "unresolved",
            source: None,
            title: reference_title.to_string(),
            chars: char_len(&reference_body),
            content: reference_body,
            detail: Some(match reason {
                Unresolved::Transport(e) => e.to_string(),
                other => reason_label(&other).to_string(),
            }),
        },
    }
}
