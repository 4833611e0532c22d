//! Pagination ("next page") link discovery, run against the full
//! document (not the scored main-content block).

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

static REL_NEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[rel="next"]"#).expect("BUG: hardcoded selector"));
static NEXT_CLASS_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".next, .pagination-next, .nav-next").expect("BUG: hardcoded selector")
});
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("BUG: hardcoded selector"));

const FUZZY_PHRASES: &[&str] = &["next page", "next >", "older posts", "下一页"];

fn find_href_in_or_below(el: ElementRef<'_>) -> Option<&str> {
    if el.value().name() == "a" {
        return el.value().attr("href");
    }
    el.select(&ANCHOR_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
}

/// Discover "next page" links: `rel="next"`, class-based navigation
/// markers, and fuzzy anchor-text matching. Deduplicated.
#[must_use]
pub fn get_pagination_links(document: &Html, base: &Url) -> Vec<String> {
    let mut links = HashSet::new();

    if let Some(el) = document.select(&REL_NEXT_SELECTOR).next() {
        if let Some(href) = el.value().attr("href") {
            if let Ok(resolved) = base.join(href) {
                links.insert(resolved.to_string());
            }
        }
    }

    for el in document.select(&NEXT_CLASS_SELECTOR) {
        if let Some(href) = find_href_in_or_below(el) {
            if let Ok(resolved) = base.join(href) {
                links.insert(resolved.to_string());
            }
        }
    }

    for a in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let text = a.text().collect::<String>().trim().to_ascii_lowercase();

        let fuzzy_short_match = FUZZY_PHRASES.iter().any(|p| text.contains(p)) && text.chars().count() < 20;
        let exact_next = text == "next" || text.starts_with("next ");

        if fuzzy_short_match || exact_next {
            if let Ok(resolved) = base.join(href) {
                links.insert(resolved.to_string());
            }
        }
    }

    links.into_iter().collect()
}
