//! Pluggable HTML parsing.
//!
//! Publishers occasionally ship markup that makes an HTML5 tree builder
//! swallow the rest of the page: a `<!--` that is never closed, or a
//! `<script>` without its end tag. [`StrictParser`] takes the markup as
//! served; [`LenientParser`] repairs those cases first. The content extractor
//! runs once per parser and stops at the first one that yields a body.

use scraper::Html;

/// Turns decoded markup into a DOM.
pub trait HtmlParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, html: &str) -> Html;
}

/// Parse the markup exactly as served.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictParser;

impl HtmlParser for StrictParser {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn parse(&self, html: &str) -> Html {
        Html::parse_document(html)
    }
}

/// Repair markup that would otherwise hide content, then parse.
#[derive(Debug, Default, Clone, Copy)]
pub struct LenientParser;

/// Elements whose content is raw text up to a matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "noembed", "noframes", "iframe",
];

impl HtmlParser for LenientParser {
    fn name(&self) -> &'static str {
        "lenient"
    }

    fn parse(&self, html: &str) -> Html {
        Html::parse_document(&repair_markup(html))
    }
}

/// Apply every repair in turn.
pub fn repair_markup(html: &str) -> String {
    let mut out = html.replace('\0', "").replace("--!>", "-->");
    out = drop_unterminated_comments(&out);
    for tag in RAW_TEXT_ELEMENTS {
        out = close_unterminated_raw_text(&out, tag);
    }
    out
}

/// Remove `<!--` openers that have no `-->` after them.
fn drop_unterminated_comments(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find("<!--") {
        let after = &rest[start + 4..];
        match after.find("-->") {
            Some(end) => {
                let stop = start + 4 + end + 3;
                out.push_str(&rest[..stop]);
                rest = &rest[stop..];
            }
            None => {
                out.push_str(&rest[..start]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Insert an end tag right after any `<tag ...>` that is never closed.
fn close_unterminated_raw_text(html: &str, tag: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}");

    let mut out = String::with_capacity(html.len() + 16);
    let mut pos = 0;
    while let Some(found) = lower[pos..].find(&open) {
        let start = pos + found;
        let name_end = start + open.len();
        let is_tag = lower[name_end..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace());
        let Some(gt) = lower[name_end..].find('>').map(|i| name_end + i + 1) else {
            break;
        };
        if !is_tag {
            out.push_str(&html[pos..name_end]);
            pos = name_end;
            continue;
        }
        out.push_str(&html[pos..gt]);
        match lower[gt..].find(&close) {
            Some(end) => {
                // step past the end tag name so the loop does not re-match it
                let after_close = gt + end + close.len();
                out.push_str(&html[gt..after_close]);
                pos = after_close;
            }
            None => {
                out.push_str(&format!("</{tag}>"));
                pos = gt;
            }
        }
    }
    out.push_str(&html[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn article_text(html: &Html) -> String {
        let sel = Selector::parse("article").unwrap();
        html.select(&sel)
            .next()
            .map(|a| a.text().collect::<String>())
            .unwrap_or_default()
    }

    #[test]
    fn test_unterminated_comment_hides_content_only_for_strict() {
        let page = "<html><body><!-- promo start <article><p>기사 본문</p></article></body></html>";
        assert_eq!(article_text(&StrictParser.parse(page)), "");
        assert_eq!(article_text(&LenientParser.parse(page)), "기사 본문");
    }

    #[test]
    fn test_unclosed_script_is_closed() {
        let page = "<html><head><script type=\"text/javascript\">var a = 1;</head><body><article><p>본문</p></article></body></html>";
        assert_eq!(article_text(&StrictParser.parse(page)), "");
        assert_eq!(article_text(&LenientParser.parse(page)), "본문");
    }

    #[test]
    fn test_repair_leaves_well_formed_markup_alone() {
        let page = "<html><head><title>제목</title><script>x()</script></head><body><!-- ok --><p>a</p></body></html>";
        assert_eq!(repair_markup(page), page);
    }

    #[test]
    fn test_similar_tag_names_are_not_confused() {
        let page = "<scripts>hello<titles>";
        assert_eq!(close_unterminated_raw_text(page, "script"), page);
        assert_eq!(close_unterminated_raw_text(page, "title"), page);
    }

    #[test]
    fn test_nul_bytes_and_bang_comment_closers() {
        assert_eq!(repair_markup("a\0b<!-- c --!>d"), "ab<!-- c -->d");
    }

    #[test]
    fn test_parser_names() {
        assert_eq!(StrictParser.name(), "strict");
        assert_eq!(LenientParser.name(), "lenient");
    }
}
