//! # Short Kinds
//!
//! Collects the day's top-ranked news issues from the KINDS issue API and
//! recovers a complete, clean body for each issue's lead articles. The issue
//! source often ships bodies cut off mid-sentence; when that happens the
//! crawler fetches the publisher's own page (or a mobile/AMP mirror of it)
//! and pulls the article text out of the markup.
//!
//! ## Usage
//!
//! ```sh
//! KINDS_ACCESS_KEY=... short_kinds --date 2025-02-06 --max-topics 5
//! short_kinds --url https://www.khan.co.kr/article/202502061030001
//! ```
//!
//! ## Architecture
//!
//! The application follows a staged pipeline, each stage checkpointed to JSON:
//! 1. **Collect**: Rank the day's issues and keep the top N
//! 2. **Crawl**: Look up each issue's articles and replace truncated bodies
//!    with text recovered from the live page

use chrono::{Local, NaiveDate};
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod crawler;
mod models;
mod outputs;
mod pipeline;
mod utils;

use api::KindsClient;
use cli::{Cli, Stage};
use config::load_settings;
use crawler::fetch::HttpFetcher;
use crawler::noise::NoiseRules;
use crawler::orchestrator::ArticleCrawler;
use crawler::publishers::PublisherRegistry;
use crawler::ExtractionRules;
use models::{ArticleCheckpoint, IssueDigest};
use outputs::json::{articles_file_name, issues_file_name, load_checkpoint, write_checkpoint};
use pipeline::{collect_issues, crawl_articles, extract_single};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("short_kinds starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.date, ?args.stage, %args.output_dir, "Parsed CLI arguments");

    let settings = load_settings(args.config.as_deref()).await?;
    let rules = ExtractionRules::new(
        PublisherRegistry::korean_outlets(),
        NoiseRules::default().with_link_density_limit(settings.link_density_limit),
    );
    info!(
        publishers = rules.publishers.profiles().len(),
        link_density_limit = settings.link_density_limit,
        "Extraction rules ready"
    );
    let fetcher = HttpFetcher::new(settings.request_timeout())?;
    let crawler = ArticleCrawler::new(&fetcher, &rules, &settings);

    // ---- One-off extraction ----
    if let Some(url) = args.url.as_deref() {
        let result = extract_single(
            &crawler,
            url,
            args.reference_title.as_deref().unwrap_or_default(),
            args.reference_body.as_deref().unwrap_or_default(),
            args.provider.as_deref().unwrap_or_default(),
        )
        .await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let requested_date = match args.date.as_deref() {
        Some(d) => Some(NaiveDate::parse_from_str(d, "%Y-%m-%d")?.to_string()),
        None => None,
    };
    let today = Local::now().date_naive().to_string();
    let date = requested_date.clone().unwrap_or_else(|| today.clone());
    info!(%date, max_topics = args.max_topics, per_topic_docs = args.per_topic_docs, "Run parameters");

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // Only built when a stage actually calls the API
    let client = if args.needs_issue_api() {
        let access_key = args.kinds_access_key.as_deref().unwrap_or_default();
        Some(KindsClient::with_backoff(access_key, settings.request_timeout())?)
    } else {
        None
    };

    // ---- Stage 1: issues ----
    let digest: IssueDigest = match args.issues_file.as_deref() {
        Some(path) => {
            let mut digest: IssueDigest = load_checkpoint(path).await?;
            digest.truncate_topics(args.max_topics);
            info!(path, date = %digest.date, topics = digest.topics.len(), "Using saved issues");
            digest
        }
        None => {
            let client = client.as_ref().ok_or("issue API client not configured")?;
            let digest =
                collect_issues(client, &date, &settings.provider_filter, args.max_topics).await?;
            write_checkpoint(&digest, &args.output_dir, &issues_file_name(&date)).await?;
            digest
        }
    };

    if args.stage == Stage::Collect {
        info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Stopping after collect stage");
        return Ok(());
    }

    // ---- Stage 2: articles ----
    let client = client.as_ref().ok_or("issue API client not configured")?;
    let checkpoint_date = match requested_date.as_deref() {
        Some(d) => d.to_string(),
        None => digest.date_or(&today).to_string(),
    };
    let articles =
        crawl_articles(client, &crawler, &settings, &digest, args.per_topic_docs).await;
    let checkpoint = ArticleCheckpoint { articles };
    write_checkpoint(&checkpoint, &args.output_dir, &articles_file_name(&checkpoint_date)).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = checkpoint.articles.len(),
        "Execution complete"
    );

    Ok(())
}
