//! JSON-LD structured data embedded in article pages.
//!
//! Publishers put a `NewsArticle` object (sometimes inside an `@graph`
//! array, sometimes as a top-level array) in
//! `<script type="application/ld+json">`. Both the body extractor and the
//! title extractor read from the same flattened object list.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Every JSON object found in the page's JSON-LD blocks, `@graph` entries
/// appended after their parent, in document order. Blocks that fail to parse
/// are skipped.
pub fn json_ld_objects(document: &Html) -> Vec<Map<String, Value>> {
    let mut objects = Vec::new();
    for script in document.select(&LD_JSON) {
        let raw = script.text().collect::<String>();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable JSON-LD block");
                continue;
            }
        };
        match value {
            Value::Object(map) => {
                let graph = match map.get("@graph") {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                objects.push(map);
                objects.extend(graph.into_iter().filter_map(into_object));
            }
            Value::Array(items) => objects.extend(items.into_iter().filter_map(into_object)),
            _ => {}
        }
    }
    objects
}

fn into_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// The object's `@type` (or `type`), list entries joined with spaces.
fn type_of(object: &Map<String, Value>) -> String {
    match object.get("@type").or_else(|| object.get("type")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// First article body longer than `min_chars` from an object typed as an
/// `Article`/`NewsArticle`.
pub fn article_body(objects: &[Map<String, Value>], min_chars: usize) -> Option<String> {
    objects
        .iter()
        .filter(|o| type_of(o).contains("Article"))
        .filter_map(|o| {
            o.get("articleBody")
                .and_then(Value::as_str)
                .or_else(|| o.get("body").and_then(Value::as_str))
        })
        .find(|body| body.chars().count() > min_chars)
        .map(str::to_string)
}

/// First non-blank `headline` from any object.
pub fn headline(objects: &[Map<String, Value>]) -> Option<String> {
    objects
        .iter()
        .filter_map(|o| o.get("headline").and_then(Value::as_str))
        .find(|h| !h.trim().is_empty())
        .map(str::to_string)
}
