//! Alternate URLs for one article: mobile mirrors, AMP endpoints, host swaps.

use crate::crawler::publishers::{host_of, PublisherRegistry, Rewrite};
use itertools::Itertools;
use tracing::debug;
use url::Url;

/// A URL believed to resolve to the same article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCandidate {
    pub url: String,
    /// 0 for the input URL, increasing with each rewrite.
    pub origin_rank: usize,
}

/// Expand `url` into the ordered, de-duplicated list of URLs to try.
///
/// The input URL always comes first, unchanged. Every rewrite rule of the
/// owning publisher whose host condition holds then contributes at most one
/// URL, in declaration order. Unknown hosts and unparseable URLs yield only
/// the input.
pub fn generate_candidates(url: &str, registry: &PublisherRegistry) -> Vec<FetchCandidate> {
    let mut urls = vec![url.to_string()];

    let host = host_of(url);
    if let (Ok(parsed), Some(profile)) = (Url::parse(url), registry.lookup(&host)) {
        urls.extend(
            profile
                .rewrites
                .iter()
                .filter(|rule| rule.when.matches(&host))
                .filter_map(|rule| apply_rewrite(&parsed, &rule.rewrite)),
        );
    }

    let candidates: Vec<FetchCandidate> = urls
        .into_iter()
        .unique()
        .enumerate()
        .map(|(origin_rank, url)| FetchCandidate { url, origin_rank })
        .collect();
    debug!(%url, count = candidates.len(), "Generated fetch candidates");
    candidates
}

/// The rewritten URL, or `None` when the rule does not apply to this URL.
pub fn apply_rewrite(url: &Url, rewrite: &Rewrite) -> Option<String> {
    let mut out = url.clone();
    match *rewrite {
        Rewrite::AmpFromQueryId { param, template } => {
            let id = url
                .query_pairs()
                .find(|(k, _)| k == param)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_alphanumeric()))?;
            return Some(template.replace("{id}", &id));
        }
        Rewrite::AppendQuery(pair) => {
            let query = match url.query() {
                Some(q) if q.split('&').any(|p| p == pair) => return None,
                Some(q) if !q.is_empty() => format!("{q}&{pair}"),
                _ => pair.to_string(),
            };
            out.set_query(Some(&query));
        }
        Rewrite::PathSuffix { suffix, marker } => {
            if url.path().contains(marker) {
                return None;
            }
            let path = format!("{}{}", url.path().trim_end_matches('/'), suffix);
            out.set_path(&path);
        }
        Rewrite::PathInsert { from, to, marker } => {
            out.set_path(&insert_segment(url.path(), from, to, marker)?);
        }
        Rewrite::Host(host) => {
            out.set_host(Some(host)).ok()?;
        }
        Rewrite::HostWithPathInsert {
            host,
            from,
            to,
            marker,
        } => {
            out.set_host(Some(host)).ok()?;
            out.set_path(&insert_segment(url.path(), from, to, marker)?);
        }
    }
    Some(out.to_string())
}

fn insert_segment(path: &str, from: &str, to: &str, marker: &str) -> Option<String> {
    (path.contains(from) && !path.contains(marker)).then(|| path.replacen(from, to, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(url: &str) -> Vec<String> {
        generate_candidates(url, &PublisherRegistry::korean_outlets())
            .into_iter()
            .map(|c| c.url)
            .collect()
    }

    #[test]
    fn test_unknown_host_yields_only_input() {
        assert_eq!(urls("https://example.com/news/1"), vec!["https://example.com/news/1"]);
        assert_eq!(urls("not a url"), vec!["not a url"]);
    }

    #[test]
    fn test_sbs_amp_from_query_id() {
        let got = urls("https://news.sbs.co.kr/news/endPage.do?news_id=N1007981234&plink=ORI");
        assert_eq!(
            got,
            vec![
                "https://news.sbs.co.kr/news/endPage.do?news_id=N1007981234&plink=ORI",
                "https://news.sbs.co.kr/amp/news.amp?news_id=N1007981234",
            ]
        );
    }

    #[test]
    fn test_khan_rules_fire_in_declared_order() {
        let got = urls("https://www.khan.co.kr/article/202502061030001");
        assert_eq!(
            got,
            vec![
                "https://www.khan.co.kr/article/202502061030001",
                "https://www.khan.co.kr/article/202502061030001/amp",
                "https://m.khan.co.kr/article/202502061030001",
                "https://www.khan.co.kr/article/202502061030001?output=amp",
            ]
        );
    }

    #[test]
    fn test_path_marker_suppresses_rewrite() {
        let got = urls("https://www.chosun.com/national/2025/02/06/ABC/amp/");
        assert_eq!(got[0], "https://www.chosun.com/national/2025/02/06/ABC/amp/");
        assert!(!got.iter().any(|u| u.ends_with("/amp/amp/")));
    }

    #[test]
    fn test_donga_host_conditions() {
        let news = urls("https://news.donga.com/3/all/20250206/130000000/1");
        assert_eq!(
            news,
            vec![
                "https://news.donga.com/3/all/20250206/130000000/1",
                "https://news.donga.com/3/amp/all/20250206/130000000/1",
                "https://www.donga.com/3/all/20250206/130000000/1",
            ]
        );
        let www = urls("https://www.donga.com/news/article/all/20250206/130000000/1");
        assert_eq!(
            www,
            vec![
                "https://www.donga.com/news/article/all/20250206/130000000/1",
                "https://news.donga.com/news/article/all/20250206/130000000/1",
                "https://news.donga.com/news/article/amp/all/20250206/130000000/1",
            ]
        );
    }

    #[test]
    fn test_original_first_and_no_duplicates() {
        // Already on the mobile host: the host swap reproduces the input.
        let got = urls("https://m.hani.co.kr/arti/society/1180000.html");
        assert_eq!(got[0], "https://m.hani.co.kr/arti/society/1180000.html");
        assert_eq!(got.len(), got.iter().unique().count());
        assert_eq!(got.len(), 2);

        let query = urls("https://www.joongang.co.kr/article/25312345?view=amp");
        assert_eq!(query, vec!["https://www.joongang.co.kr/article/25312345?view=amp"]);
    }

    #[test]
    fn test_origin_rank_follows_order() {
        let candidates = generate_candidates(
            "https://www.kmib.co.kr/article/view.asp?arcid=0020000001",
            &PublisherRegistry::korean_outlets(),
        );
        assert!(candidates.iter().enumerate().all(|(i, c)| c.origin_rank == i));
        assert_eq!(
            candidates.last().unwrap().url,
            "https://www.kmib.co.kr/article/view.asp?arcid=0020000001&view=amp"
        );
    }
}
