//! Destructive removal of boilerplate subtrees from a parsed page.
//!
//! The sweep works directly on the `ego_tree` behind [`scraper::Html`]:
//! detached nodes and everything below them are gone for any later
//! selection or text extraction on the same document.

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

/// Elements that never carry article prose.
pub const ALWAYS_REMOVED: &[&str] = &[
    "script", "style", "noscript", "iframe", "embed", "form", "aside", "nav", "header", "footer",
];

/// ARIA roles marking page furniture.
pub const NOISY_ROLES: &[&str] = &["banner", "complementary", "navigation"];

/// Default link-density limit. Containers strictly above it are dropped.
pub const LINK_DENSITY_LIMIT: f64 = 0.5;

static NOISY_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[-_\s])(?:ad|ads|advert|sponsor|banner|promo|related|recommend|rec-|share|social|subscribe|footer|copyright|notice|policy|widget|sidebar|nav|breadcrumb|comment|emoji|btn|login|headline_list|breaking|hot|most|popular)",
    )
    .unwrap()
});

/// The attribute pattern, role set and link-density limit used to decide
/// whether an element is boilerplate.
#[derive(Debug, Clone)]
pub struct NoiseRules {
    pattern: Regex,
    roles: &'static [&'static str],
    removed_tags: &'static [&'static str],
    link_density_limit: f64,
}

impl Default for NoiseRules {
    fn default() -> Self {
        Self {
            pattern: NOISY_TOKEN_RE.clone(),
            roles: NOISY_ROLES,
            removed_tags: ALWAYS_REMOVED,
            link_density_limit: LINK_DENSITY_LIMIT,
        }
    }
}

impl NoiseRules {
    pub fn with_link_density_limit(mut self, limit: f64) -> Self {
        self.link_density_limit = limit;
        self
    }

    /// id, any class token or the ARIA role marks the element as furniture.
    pub fn attributes_match(&self, element: &scraper::node::Element) -> bool {
        if element.id().is_some_and(|id| self.pattern.is_match(id)) {
            return true;
        }
        if element.classes().any(|class| self.pattern.is_match(class)) {
            return true;
        }
        element
            .attr("role")
            .map(|role| role.trim().to_ascii_lowercase())
            .is_some_and(|role| self.roles.contains(&role.as_str()))
    }

    pub fn is_noise(&self, element: ElementRef<'_>) -> bool {
        self.attributes_match(element.value())
            || link_density(element) > self.link_density_limit
    }
}

fn stripped_text_len(element: ElementRef<'_>) -> usize {
    element.text().map(|t| t.trim().chars().count()).sum()
}

/// Anchor text length over the element's own text length (floor 1).
///
/// Only anchors *below* the element count, so a bare `<a>` scores zero.
pub fn link_density(element: ElementRef<'_>) -> f64 {
    let text_len = stripped_text_len(element);
    if text_len == 0 {
        return 0.0;
    }
    let link_len: usize = element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "a")
        .map(stripped_text_len)
        .sum();
    link_len as f64 / text_len.max(1) as f64
}

/// Strip the whole document.
pub fn strip_noise(html: &mut Html, rules: &NoiseRules) {
    let root = html.tree.root().id();
    strip_noise_within(html, root, rules);
}

/// Strip everything below `root` (the node itself is kept).
///
/// First the tags in the removal list go unconditionally, then a depth-first
/// sweep visits each remaining element parent-first and detaches it when
/// its attributes or link density say so.
pub fn strip_noise_within(html: &mut Html, root: NodeId, rules: &NoiseRules) {
    let Some(root_ref) = html.tree.get(root) else {
        return;
    };
    let doomed: Vec<NodeId> = root_ref
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|e| rules.removed_tags.contains(&e.value().name()))
        .map(|e| e.id())
        .collect();
    for id in doomed {
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
        }
    }

    let mut stack: Vec<NodeId> = children_of(html, root);
    stack.reverse();
    while let Some(id) = stack.pop() {
        let Some(element) = html.tree.get(id).and_then(ElementRef::wrap) else {
            continue;
        };
        if rules.is_noise(element) {
            if let Some(mut node) = html.tree.get_mut(id) {
                node.detach();
            }
            continue;
        }
        let mut children = children_of(html, id);
        children.reverse();
        stack.extend(children);
    }
}

fn children_of(html: &Html, id: NodeId) -> Vec<NodeId> {
    html.tree
        .get(id)
        .map(|node| node.children().map(|c| c.id()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn body_text(html: &Html) -> String {
        let sel = Selector::parse("body").unwrap();
        html.select(&sel)
            .next()
            .map(|b| b.text().collect::<String>())
            .unwrap_or_default()
    }

    #[test]
    fn test_class_token_alone_removes_element() {
        let mut html = Html::parse_document(
            r#"<html><body><div class="share-box">평범한 문장으로만 이루어진 상자</div><p>본문 문장</p></body></html>"#,
        );
        strip_noise(&mut html, &NoiseRules::default());
        let text = body_text(&html);
        assert!(!text.contains("평범한 문장"));
        assert!(text.contains("본문 문장"));
    }

    #[test]
    fn test_link_density_exactly_half_is_kept() {
        let mut html = Html::parse_document(
            r#"<html><body><div id="keep"><a href="/x">abcd</a>efgh</div></body></html>"#,
        );
        strip_noise(&mut html, &NoiseRules::default());
        assert!(body_text(&html).contains("efgh"));
    }

    #[test]
    fn test_lower_link_density_limit_drops_half_linked_block() {
        let mut html = Html::parse_document(
            r#"<html><body><div id="keep"><a href="/x">abcd</a>efgh</div></body></html>"#,
        );
        let body = html.select(&Selector::parse("body").unwrap()).next().unwrap().id();
        strip_noise_within(&mut html, body, &NoiseRules::default().with_link_density_limit(0.4));
        assert!(body_text(&html).is_empty());
    }

    #[test]
    fn test_link_dense_element_is_removed() {
        let mut html = Html::parse_document(
            r#"<html><body><div><p>기사 본문은 여기에 충분히 길게 있습니다</p></div><div class="list"><a href="/1">첫 번째 링크</a><a href="/2">두 번째 링크</a> 끝</div></body></html>"#,
        );
        strip_noise(&mut html, &NoiseRules::default());
        let text = body_text(&html);
        assert!(text.contains("기사 본문은"));
        assert!(!text.contains("첫 번째 링크"));
    }

    #[test]
    fn test_bare_anchor_is_not_link_dense() {
        let html = Html::parse_document(r#"<p><a href="/x">링크 텍스트</a></p>"#);
        let a = html.select(&Selector::parse("a").unwrap()).next().unwrap();
        assert_eq!(link_density(a), 0.0);
    }

    #[test]
    fn test_structural_tags_and_roles_removed() {
        let mut html = Html::parse_document(
            r#"<html><body><header>머리</header><nav>메뉴</nav><div role="complementary">곁가지</div><script>var x = 1;</script><p>본문</p><footer>바닥</footer></body></html>"#,
        );
        strip_noise(&mut html, &NoiseRules::default());
        let text = body_text(&html);
        assert_eq!(text.trim(), "본문");
    }

    #[test]
    fn test_token_pattern_is_anchored_at_segments() {
        let rules = NoiseRules::default();
        let html = Html::parse_document(
            r#"<div class="article-header thread">x</div><div class="ad_slot">y</div><div id="related-news">z</div>"#,
        );
        let divs: Vec<_> = html.select(&Selector::parse("div").unwrap()).collect();
        assert!(!rules.attributes_match(divs[0].value()));
        assert!(rules.attributes_match(divs[1].value()));
        assert!(rules.attributes_match(divs[2].value()));
    }

    #[test]
    fn test_strip_within_keeps_container() {
        let mut html = Html::parse_document(
            r#"<html><body><div id="box"><p>남길 문장</p><div class="sidebar">지울 문장</div></div></body></html>"#,
        );
        let id = html
            .select(&Selector::parse("#box").unwrap())
            .next()
            .unwrap()
            .id();
        strip_noise_within(&mut html, id, &NoiseRules::default());
        let text = body_text(&html);
        assert!(text.contains("남길 문장"));
        assert!(!text.contains("지울 문장"));
    }
}
