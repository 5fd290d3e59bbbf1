//! Publisher profiles for the Korean outlets the crawler knows about.
//!
//! Everything host-specific lives here as data: which containers hold the
//! article body, how a URL can be rewritten to reach a mobile or AMP mirror,
//! which cleanup policy suits the outlet's markup, and how to recognise a
//! "page not found" body served with HTTP 200.
//!
//! The table is built once at start-up ([`PublisherRegistry::korean_outlets`])
//! and only ever read afterwards, so it can be shared freely between
//! concurrent extractions.

use crate::crawler::cleanup::CleanupPolicy;

/// Restricts a [`RewriteRule`] to (or away from) one exact host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCondition {
    Any,
    Is(&'static str),
    IsNot(&'static str),
}

impl HostCondition {
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostCondition::Any => true,
            HostCondition::Is(h) => host == *h,
            HostCondition::IsNot(h) => host != *h,
        }
    }
}

/// One way of turning an article URL into an alternate URL for the same story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Read a numeric id from the query string and substitute it for `{id}`
    /// in `template`.
    AmpFromQueryId {
        param: &'static str,
        template: &'static str,
    },
    /// Append `key=value` to the existing query string.
    AppendQuery(&'static str),
    /// Append a suffix to the path (trailing slashes trimmed first), unless
    /// the path already contains `marker`.
    PathSuffix {
        suffix: &'static str,
        marker: &'static str,
    },
    /// Replace the first `from` segment of the path with `to`, when the path
    /// contains `from` and not `marker`.
    PathInsert {
        from: &'static str,
        to: &'static str,
        marker: &'static str,
    },
    /// Same URL on another host.
    Host(&'static str),
    /// Another host combined with a [`Rewrite::PathInsert`].
    HostWithPathInsert {
        host: &'static str,
        from: &'static str,
        to: &'static str,
        marker: &'static str,
    },
}

/// A rewrite together with the host condition that enables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteRule {
    pub when: HostCondition,
    pub rewrite: Rewrite,
}

impl RewriteRule {
    const fn always(rewrite: Rewrite) -> Self {
        Self {
            when: HostCondition::Any,
            rewrite,
        }
    }

    const fn on(host: &'static str, rewrite: Rewrite) -> Self {
        Self {
            when: HostCondition::Is(host),
            rewrite,
        }
    }

    const fn off(host: &'static str, rewrite: Rewrite) -> Self {
        Self {
            when: HostCondition::IsNot(host),
            rewrite,
        }
    }
}

/// Selector list for one exact hostname.
#[derive(Debug, Clone)]
pub struct HostSelectors {
    pub host: &'static str,
    pub selectors: &'static [&'static str],
}

/// Everything the crawler knows about one outlet.
#[derive(Debug, Clone)]
pub struct PublisherProfile {
    /// Provider name as the issue source spells it.
    pub name: &'static str,
    /// Registrable domain; any host equal to it or ending in `.{domain}` belongs here.
    pub domain: &'static str,
    pub hosts: Vec<HostSelectors>,
    pub rewrites: Vec<RewriteRule>,
    pub policy: CleanupPolicy,
    /// Policy used instead of `policy` when the page URL is an AMP variant.
    pub amp_policy: Option<CleanupPolicy>,
    /// Each group matches when all of its (lowercase) substrings occur in the page.
    pub not_found: &'static [&'static [&'static str]],
}

impl PublisherProfile {
    /// Body-container selectors declared for this exact host, if any.
    pub fn selectors_for(&self, host: &str) -> Option<&'static [&'static str]> {
        self.hosts
            .iter()
            .find(|h| h.host == host)
            .map(|h| h.selectors)
    }

    /// Pick the text cleanup policy for a page at `url` on this outlet.
    pub fn cleanup_policy(&self, url: &str) -> CleanupPolicy {
        match self.amp_policy {
            Some(amp) if is_amp_url(url) => amp,
            _ => self.policy,
        }
    }

    /// True when the decoded page is the outlet's "page not found" body.
    pub fn is_not_found_page(&self, html: &str) -> bool {
        if self.not_found.is_empty() {
            return false;
        }
        let low = html.to_lowercase();
        self.not_found
            .iter()
            .any(|group| !group.is_empty() && group.iter().all(|needle| low.contains(needle)))
    }
}

fn is_amp_url(url: &str) -> bool {
    url.contains("/amp")
}

/// Lowercase a hostname and drop any port.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.');
    let host = match host.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    };
    host.to_ascii_lowercase()
}

/// Host of `url`, normalised; empty when the URL does not parse.
pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(normalize_host))
        .unwrap_or_default()
}

/// Read-only lookup table from hostname to [`PublisherProfile`].
#[derive(Debug, Clone)]
pub struct PublisherRegistry {
    profiles: Vec<PublisherProfile>,
}

impl PublisherRegistry {
    pub fn new(profiles: Vec<PublisherProfile>) -> Self {
        Self { profiles }
    }

    /// Profile owning `host`, matched on a dot boundary.
    pub fn lookup(&self, host: &str) -> Option<&PublisherProfile> {
        let host = normalize_host(host);
        self.profiles.iter().find(|p| {
            host == p.domain
                || host
                    .strip_suffix(p.domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    pub fn profiles(&self) -> &[PublisherProfile] {
        &self.profiles
    }

    /// The nine outlets of the daily issue feed.
    pub fn korean_outlets() -> Self {
        Self::new(vec![
            PublisherProfile {
                name: "국민일보",
                domain: "kmib.co.kr",
                hosts: vec![
                    HostSelectors {
                        host: "www.kmib.co.kr",
                        selectors: &[
                            "#articleBody",
                            "div#articleBody",
                            ".article-body",
                            ".art_body",
                            ".news_view",
                            "article",
                            "[itemprop='articleBody']",
                        ],
                    },
                    HostSelectors {
                        host: "m.kmib.co.kr",
                        selectors: &[
                            "#articleBody",
                            ".article-body",
                            ".art_body",
                            ".news_view",
                            "article",
                            "[itemprop='articleBody']",
                        ],
                    },
                    HostSelectors {
                        host: "amp.kmib.co.kr",
                        selectors: &["[itemprop='articleBody']", "article", "#articleBody"],
                    },
                ],
                rewrites: vec![
                    RewriteRule::always(Rewrite::Host("m.kmib.co.kr")),
                    RewriteRule::always(Rewrite::Host("news.kmib.co.kr")),
                    RewriteRule::always(Rewrite::Host("amp.kmib.co.kr")),
                    RewriteRule::always(Rewrite::AppendQuery("view=amp")),
                ],
                policy: CleanupPolicy::Standard,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "SBS",
                domain: "sbs.co.kr",
                hosts: vec![HostSelectors {
                    host: "news.sbs.co.kr",
                    selectors: &[
                        "[itemprop='articleBody']",
                        "article",
                        "#news_body_area",
                        ".article_cont",
                        ".news_cnt",
                        ".news_text",
                        ".text_area",
                        ".viewer",
                    ],
                }],
                rewrites: vec![RewriteRule::on(
                    "news.sbs.co.kr",
                    Rewrite::AmpFromQueryId {
                        param: "news_id",
                        template: "https://news.sbs.co.kr/amp/news.amp?news_id={id}",
                    },
                )],
                policy: CleanupPolicy::Standard,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "KBS",
                domain: "kbs.co.kr",
                hosts: vec![HostSelectors {
                    host: "news.kbs.co.kr",
                    selectors: &[
                        "[itemprop='articleBody']",
                        "article .detail-body",
                        "article .content",
                        "article",
                        "#cont_newstext",
                        ".detailContent",
                        ".detail_body",
                        "#news_textArea",
                        "#newsContent",
                        ".news_body",
                        "#content",
                        "#contents",
                    ],
                }],
                rewrites: Vec::new(),
                policy: CleanupPolicy::Broadcast,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "MBC",
                domain: "imbc.com",
                hosts: vec![HostSelectors {
                    host: "imnews.imbc.com",
                    selectors: &[".news_txt", "[itemprop='articleBody']", "article .news_txt"],
                }],
                rewrites: Vec::new(),
                policy: CleanupPolicy::Broadcast,
                amp_policy: None,
                not_found: &[
                    &["요청하신 페이지를 찾을 수 없습니다"],
                    &["class=\"error\"", "mbc"],
                ],
            },
            PublisherProfile {
                name: "조선일보",
                domain: "chosun.com",
                hosts: vec![
                    HostSelectors {
                        host: "www.chosun.com",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article .article-body",
                            "article .content",
                            "article",
                            "div#news_item",
                            "div#content",
                            "div#contents",
                            ".article-body__content",
                        ],
                    },
                    HostSelectors {
                        host: "news.chosun.com",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article",
                            "#news_body_id",
                            ".article-body",
                            ".par",
                            "#news_content",
                        ],
                    },
                    HostSelectors {
                        host: "amp.chosun.com",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article",
                            ".article-body",
                            ".content",
                            "#content",
                        ],
                    },
                ],
                rewrites: vec![
                    RewriteRule::always(Rewrite::PathSuffix {
                        suffix: "/amp/",
                        marker: "/amp/",
                    }),
                    RewriteRule::always(Rewrite::Host("news.chosun.com")),
                ],
                policy: CleanupPolicy::Standard,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "중앙일보",
                domain: "joongang.co.kr",
                hosts: vec![HostSelectors {
                    host: "www.joongang.co.kr",
                    selectors: &[
                        "[itemprop='articleBody']",
                        "article .article-body",
                        "article .content",
                        "article",
                        "#article_body",
                        ".article-body",
                        ".ab_sub",
                    ],
                }],
                rewrites: vec![RewriteRule::always(Rewrite::AppendQuery("view=amp"))],
                policy: CleanupPolicy::Standard,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "중앙일보",
                domain: "joins.com",
                hosts: vec![HostSelectors {
                    host: "news.joins.com",
                    selectors: &[
                        "[itemprop='articleBody']",
                        "article",
                        "#article_body",
                        ".article_body",
                        ".content",
                    ],
                }],
                rewrites: vec![RewriteRule::always(Rewrite::AppendQuery("view=amp"))],
                policy: CleanupPolicy::Standard,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "동아일보",
                domain: "donga.com",
                hosts: vec![
                    HostSelectors {
                        host: "www.donga.com",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article .article_body",
                            "article .article_txt",
                            "article",
                            "#content",
                            ".content",
                            ".article_txt",
                            ".article_body",
                        ],
                    },
                    HostSelectors {
                        host: "news.donga.com",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article .article_txt",
                            "article .article_body",
                            "article",
                            "#content",
                            ".content",
                        ],
                    },
                ],
                rewrites: vec![
                    RewriteRule::on(
                        "news.donga.com",
                        Rewrite::PathInsert {
                            from: "/all/",
                            to: "/amp/all/",
                            marker: "/amp/",
                        },
                    ),
                    RewriteRule::on("news.donga.com", Rewrite::Host("www.donga.com")),
                    RewriteRule::off("news.donga.com", Rewrite::Host("news.donga.com")),
                    RewriteRule::off(
                        "news.donga.com",
                        Rewrite::HostWithPathInsert {
                            host: "news.donga.com",
                            from: "/all/",
                            to: "/amp/all/",
                            marker: "/amp/",
                        },
                    ),
                ],
                policy: CleanupPolicy::Standard,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "한겨레",
                domain: "hani.co.kr",
                hosts: vec![
                    HostSelectors {
                        host: "www.hani.co.kr",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article .article-text",
                            "article .text",
                            "article",
                            ".article-text",
                            ".text",
                            "#contents",
                            "#content",
                        ],
                    },
                    HostSelectors {
                        host: "m.hani.co.kr",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article .text",
                            "article",
                            ".text",
                            ".article-text",
                            "#content",
                            "#contents",
                        ],
                    },
                ],
                rewrites: vec![
                    RewriteRule::always(Rewrite::Host("m.hani.co.kr")),
                    RewriteRule::always(Rewrite::AppendQuery("m=1")),
                ],
                policy: CleanupPolicy::Standard,
                amp_policy: None,
                not_found: &[],
            },
            PublisherProfile {
                name: "경향신문",
                domain: "khan.co.kr",
                hosts: vec![
                    HostSelectors {
                        host: "www.khan.co.kr",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "article .article-body",
                            "article .article_txt",
                            "article",
                            "#articleBody",
                            ".art_body",
                            ".scroll-article",
                            "#article",
                            ".article_txt",
                            "article[role='article']",
                            ".amp-article-body",
                            "main article",
                            "main .article-body",
                            "#contents",
                        ],
                    },
                    HostSelectors {
                        host: "m.khan.co.kr",
                        selectors: &[
                            "[itemprop='articleBody']",
                            "#articleBody",
                            ".article-body",
                            "article",
                            ".art_body",
                            ".article_txt",
                            "#content",
                        ],
                    },
                ],
                rewrites: vec![
                    RewriteRule::always(Rewrite::PathSuffix {
                        suffix: "/amp",
                        marker: "/amp",
                    }),
                    RewriteRule::always(Rewrite::Host("m.khan.co.kr")),
                    RewriteRule::always(Rewrite::AppendQuery("output=amp")),
                ],
                policy: CleanupPolicy::Standard,
                amp_policy: Some(CleanupPolicy::Light),
                not_found: &[],
            },
        ])
    }
}

impl Default for PublisherRegistry {
    fn default() -> Self {
        Self::korean_outlets()
    }
}
