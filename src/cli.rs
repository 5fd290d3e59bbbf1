//! Command-line interface definitions for Short Kinds.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The access key can also come from the environment.

use clap::{Parser, ValueEnum};

/// Last stage to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    /// Fetch the issue ranking and write checkpoint 1.
    Collect,
    /// Also crawl the articles and write checkpoint 2.
    Crawl,
}

/// Command-line arguments for the Short Kinds application.
///
/// # Examples
///
/// ```sh
/// # Today's top five issues, one article each
/// short_kinds --kinds-access-key KEY
///
/// # Resume from a saved issue checkpoint
/// short_kinds --date 2025-02-06 --issues-file outputs/checkpoint_1_issues_2025-02-06.json
///
/// # Recover one article body and print it
/// short_kinds --url https://news.sbs.co.kr/news/endPage.do?news_id=N1007981234 --reference-title "제목"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Issue date as YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// How many top-ranked issues to keep
    #[arg(long, default_value_t = 5)]
    pub max_topics: usize,

    /// How many articles to crawl per issue
    #[arg(long, default_value_t = 1)]
    pub per_topic_docs: usize,

    /// Directory for checkpoint files
    #[arg(short, long, default_value = "outputs")]
    pub output_dir: String,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Load issues from this checkpoint instead of calling the API
    #[arg(long)]
    pub issues_file: Option<String>,

    /// Extract a single article URL and print the result as JSON
    #[arg(long)]
    pub url: Option<String>,

    /// Reference title for --url
    #[arg(long, requires = "url")]
    pub reference_title: Option<String>,

    /// Reference body for --url (empty forces a fetch)
    #[arg(long, requires = "url")]
    pub reference_body: Option<String>,

    /// Provider name for --url, used to recognise outlet-name titles
    #[arg(long, requires = "url")]
    pub provider: Option<String>,

    /// KINDS API access key
    #[arg(long, env = "KINDS_ACCESS_KEY", hide_env_values = true)]
    pub kinds_access_key: Option<String>,

    /// Stop after this stage
    #[arg(long, value_enum, default_value_t = Stage::Crawl)]
    pub stage: Stage,
}

impl Cli {
    /// True when the run has to talk to the issue API: either the issues
    /// are not loaded from a file, or the crawl stage needs detail lookups.
    pub fn needs_issue_api(&self) -> bool {
        self.issues_file.is_none() || self.stage == Stage::Crawl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["short_kinds"]);

        assert_eq!(cli.date, None);
        assert_eq!(cli.max_topics, 5);
        assert_eq!(cli.per_topic_docs, 1);
        assert_eq!(cli.output_dir, "outputs");
        assert_eq!(cli.stage, Stage::Crawl);
        assert!(cli.url.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "short_kinds",
            "-d",
            "2025-02-06",
            "-o",
            "/tmp/out",
            "-c",
            "settings.yaml",
            "--stage",
            "collect",
        ]);

        assert_eq!(cli.date.as_deref(), Some("2025-02-06"));
        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.config.as_deref(), Some("settings.yaml"));
        assert_eq!(cli.stage, Stage::Collect);
    }

    #[test]
    fn test_single_url_mode() {
        let cli = Cli::parse_from([
            "short_kinds",
            "--url",
            "https://www.khan.co.kr/article/202502061030001",
            "--reference-title",
            "제목",
            "--provider",
            "경향신문",
        ]);
        assert_eq!(cli.reference_title.as_deref(), Some("제목"));
        assert_eq!(cli.reference_body, None);
        assert_eq!(cli.provider.as_deref(), Some("경향신문"));
    }

    #[test]
    fn test_reference_flags_require_url() {
        assert!(Cli::try_parse_from(["short_kinds", "--reference-title", "제목"]).is_err());
    }

    #[test]
    fn test_saved_issues_collect_needs_no_api() {
        let cli = Cli::parse_from([
            "short_kinds",
            "--issues-file",
            "outputs/checkpoint_1_issues_2025-02-06.json",
            "--stage",
            "collect",
        ]);
        assert!(!cli.needs_issue_api());

        let crawl = Cli::parse_from(["short_kinds", "--issues-file", "saved.json"]);
        assert!(crawl.needs_issue_api());
        assert!(Cli::parse_from(["short_kinds", "--stage", "collect"]).needs_issue_api());
    }
}
