//! Data models for the issue feed and the crawled article records.
//!
//! This module defines the structures passed between stages:
//! - [`IssueDigest`] / [`IssueTopic`]: the day's ranked issues, checkpoint 1
//! - [`NewsDocument`]: one article's detail record from the issue source
//! - [`ArticleRecord`] / [`ArticleCheckpoint`]: final articles, checkpoint 2
//!
//! The issue source is loose about types (ranks arrive as numbers or
//! strings, fields go missing or `null`), so the digest is read from raw
//! JSON with [`IssueDigest::from_response`] and document fields are optional.

use crate::crawler::orchestrator::BodySource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ranked issue and the news ids clustered under it.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IssueTopic {
    pub topic: String,
    pub topic_rank: Option<i64>,
    pub topic_keyword: String,
    pub news_cluster: Vec<String>,
}

/// The issue ranking for one day.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IssueDigest {
    pub date: String,
    pub topics: Vec<IssueTopic>,
}

impl IssueDigest {
    /// Read a digest out of an issue-ranking response.
    ///
    /// Looks inside `return_object` first and falls back to the top level;
    /// anything missing becomes empty. `requested_date` is used when the
    /// response does not echo a date.
    pub fn from_response(data: &Value, requested_date: &str) -> Self {
        let ro = data.get("return_object").filter(|v| v.is_object());
        let pick = |key: &str| ro.and_then(|r| r.get(key)).or_else(|| data.get(key));

        let date = pick("date")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .unwrap_or(requested_date)
            .to_string();
        let topics = pick("topics")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(IssueTopic::from_value).collect())
            .unwrap_or_default();
        Self { date, topics }
    }

    /// The digest's own date, or `fallback` when it carries none.
    pub fn date_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.date.trim().is_empty() {
            fallback
        } else {
            &self.date
        }
    }

    /// Keep only the first `max_topics` topics.
    pub fn truncate_topics(&mut self, max_topics: usize) {
        self.topics.truncate(max_topics);
    }
}

impl IssueTopic {
    fn from_value(v: &Value) -> Self {
        let text = |key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let topic_rank = match v.get("topic_rank") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        let news_cluster = match v.get("news_cluster") {
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(|id| match id {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            // Some responses send the cluster as one comma-separated string.
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };
        Self {
            topic: text("topic"),
            topic_rank,
            topic_keyword: text("topic_keyword"),
            news_cluster,
        }
    }
}

/// Detail record for one news id.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsDocument {
    pub news_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub content_original: Option<String>,
    pub provider: Option<String>,
    pub published_at: Option<String>,
    pub provider_link_page: Option<String>,
    pub url: Option<String>,
    pub link: Option<String>,
    pub byline: Option<String>,
    pub category: Option<Value>,
}

/// Fields requested from the news detail endpoint.
pub const DETAIL_FIELDS: &[&str] = &[
    "news_id",
    "title",
    "content",
    "content_original",
    "provider",
    "published_at",
    "provider_link_page",
    "url",
    "link",
    "byline",
    "category",
];

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl NewsDocument {
    pub fn title(&self) -> &str {
        non_empty(&self.title).unwrap_or_default()
    }

    pub fn provider(&self) -> &str {
        non_empty(&self.provider).unwrap_or_default()
    }

    /// The full original text when present, else the (often shortened) content.
    pub fn reference_body(&self) -> &str {
        non_empty(&self.content_original)
            .or_else(|| non_empty(&self.content))
            .unwrap_or_default()
    }

    /// Publisher page first, then the generic URL fields.
    pub fn article_url(&self) -> Option<&str> {
        non_empty(&self.provider_link_page)
            .or_else(|| non_empty(&self.url))
            .or_else(|| non_empty(&self.link))
    }

    /// Category as text; list categories are joined with `>`.
    pub fn category(&self) -> String {
        match &self.category {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(">"),
            _ => String::new(),
        }
    }
}

/// One crawled article as written to checkpoint 2.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub topic: String,
    pub topic_rank: Option<i64>,
    pub news_id: String,
    pub title: String,
    pub provider: String,
    pub category: String,
    /// `YYYY-MM-DD` when the source timestamp parses, otherwise as received.
    pub published_at: String,
    pub url: String,
    pub content: String,
    /// `"kinds"` or `"fallback"`.
    pub source: BodySource,
}

/// Checkpoint 2 file body.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ArticleCheckpoint {
    pub articles: Vec<ArticleRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digest_from_return_object() {
        let data = json!({
            "result": 0,
            "return_object": {
                "date": "2025-02-06",
                "topics": [
                    {"topic": "예산안", "topic_rank": 1, "topic_keyword": "예산,국회", "news_cluster": ["01100101.1", "02100201.2"]},
                    {"topic": "날씨", "topic_rank": "2", "news_cluster": "01100101.3, 01100101.4"}
                ]
            }
        });
        let digest = IssueDigest::from_response(&data, "2025-02-07");
        assert_eq!(digest.date, "2025-02-06");
        assert_eq!(digest.topics.len(), 2);
        assert_eq!(digest.topics[0].news_cluster.len(), 2);
        assert_eq!(digest.topics[1].topic_rank, Some(2));
        assert_eq!(digest.topics[1].topic_keyword, "");
        assert_eq!(
            digest.topics[1].news_cluster,
            vec!["01100101.3".to_string(), "01100101.4".to_string()]
        );
    }

    #[test]
    fn test_digest_falls_back_to_top_level() {
        let data = json!({"topics": [{"topic": "x", "news_cluster": null}]});
        let digest = IssueDigest::from_response(&data, "2025-02-06");
        assert_eq!(digest.date, "2025-02-06");
        assert_eq!(digest.topics[0].news_cluster, Vec::<String>::new());
        assert_eq!(digest.topics[0].topic_rank, None);

        let empty = IssueDigest::from_response(&json!("nope"), "2025-02-06");
        assert!(empty.topics.is_empty());
    }

    #[test]
    fn test_truncate_topics() {
        let mut digest = IssueDigest {
            date: "d".into(),
            topics: vec![IssueTopic::default(); 7],
        };
        digest.truncate_topics(5);
        assert_eq!(digest.topics.len(), 5);
    }

    #[test]
    fn test_date_or_prefers_saved_date() {
        let saved = IssueDigest {
            date: "2025-02-06".into(),
            topics: Vec::new(),
        };
        assert_eq!(saved.date_or("2026-10-19"), "2025-02-06");
        assert_eq!(IssueDigest::default().date_or("2026-10-19"), "2026-10-19");
    }

    #[test]
    fn test_document_field_preferences() {
        let doc: NewsDocument = serde_json::from_value(json!({
            "news_id": "01100101.1",
            "title": "제목",
            "content": "요약 본문",
            "content_original": "  ",
            "provider": "SBS",
            "provider_link_page": "",
            "url": null,
            "link": "https://news.sbs.co.kr/news/endPage.do?news_id=N1",
            "category": ["정치", "국회"]
        }))
        .unwrap();
        assert_eq!(doc.reference_body(), "요약 본문");
        assert_eq!(
            doc.article_url(),
            Some("https://news.sbs.co.kr/news/endPage.do?news_id=N1")
        );
        assert_eq!(doc.category(), "정치>국회");
        assert_eq!(doc.byline, None);
    }

    #[test]
    fn test_record_source_serialization() {
        let record = ArticleRecord {
            topic: "예산안".into(),
            topic_rank: Some(1),
            news_id: "01100101.1".into(),
            title: "제목".into(),
            provider: "SBS".into(),
            category: "정치".into(),
            published_at: "2025-02-06".into(),
            url: "https://example.com".into(),
            content: "본문".into(),
            source: BodySource::Fallback,
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["source"], "fallback");
        let back: ArticleRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, record);

        let kinds = serde_json::to_value(BodySource::Reference).unwrap();
        assert_eq!(kinds, "kinds");
    }
}
