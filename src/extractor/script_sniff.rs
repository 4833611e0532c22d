//! Script-tag JSON sniffing: find `window.__INITIAL_STATE__ = {...}` or
//! `window.__NUXT__ = {...}` assignments and emit their payload as a JSON
//! resource.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::model::{Resource, ResourceType};

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("BUG: hardcoded selector"));
static ASSIGNMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*(\{.*\})").expect("BUG: hardcoded regex"));

const MARKERS: &[&str] = &["window.__INITIAL_STATE__", "window.__NUXT__"];

/// Scan every `<script>` body in the full document for a recognized
/// global-state assignment and parse its JSON payload.
#[must_use]
pub fn sniff_script_json(document: &Html) -> Vec<Resource> {
    let mut found = Vec::new();

    for script in document.select(&SCRIPT_SELECTOR) {
        let body = script.text().collect::<String>();
        if !MARKERS.iter().any(|m| body.contains(m)) {
            continue;
        }

        let Some(caps) = ASSIGNMENT_PATTERN.captures(&body) else {
            continue;
        };
        let mut json_str = caps[1].to_string();
        if json_str.ends_with(';') {
            json_str.pop();
        }

        match serde_json::from_str::<serde_json::Value>(&json_str) {
            Ok(value) => {
                let pretty = serde_json::to_string_pretty(&value).unwrap_or(json_str);
                let mut r = Resource::inline("", pretty, ResourceType::Json, "Detected Script JSON", "");
                r.metadata.insert("source".to_string(), "script_sniffing".to_string());
                found.push(r);
            }
            Err(e) => {
                log::debug!("script-sniffed JSON failed to parse: {e}");
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_initial_state_assignment() {
        let html = r#"<script>window.__INITIAL_STATE__ = {"ua":"X"};</script>"#;
        let doc = Html::parse_document(html);
        let found = sniff_script_json(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.get("source").unwrap(), "script_sniffing");
        assert!(found[0].content.contains("\"ua\""));
    }

    #[test]
    fn ignores_unrelated_scripts() {
        let html = r#"<script>console.log("hello");</script>"#;
        let doc = Html::parse_document(html);
        assert!(sniff_script_json(&doc).is_empty());
    }
}
