//! Structured text extraction: quote blocks, article bodies, and a
//! generic main-content fallback. First non-empty strategy wins.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::model::{Resource, ResourceType};

static QUOTE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".quote").expect("BUG: hardcoded selector"));
static QUOTE_TEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".text").expect("BUG: hardcoded selector"));
static QUOTE_AUTHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".author").expect("BUG: hardcoded selector"));
static QUOTE_TAG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tag").expect("BUG: hardcoded selector"));
static ARTICLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article").expect("BUG: hardcoded selector"));
static MAIN_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main").expect("BUG: hardcoded selector"));
static CONTENT_ID_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#content").expect("BUG: hardcoded selector"));
static CONTENT_CLASS_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".content").expect("BUG: hardcoded selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("BUG: hardcoded selector"));

fn trimmed_text(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract structured text from the main-content fragment. `page_title`
/// comes from the full document (quote/article resources don't carry
/// their own title otherwise).
#[must_use]
pub fn extract_text_content(fragment: &Html, page_title: Option<&str>, page_url: &str) -> Vec<Resource> {
    let quotes = extract_quotes(fragment, page_url);
    if !quotes.is_empty() {
        return quotes;
    }

    if let Some(article) = fragment.select(&ARTICLE_SELECTOR).next() {
        let content = trimmed_text(article);
        if content.chars().count() > 100 {
            let title = page_title.unwrap_or("Article Content");
            let mut r = Resource::inline(page_url, content, ResourceType::Text, title, page_url);
            r.metadata.insert("type".to_string(), "article".to_string());
            return vec![r];
        }
    }

    let main = fragment
        .select(&MAIN_SELECTOR)
        .next()
        .or_else(|| fragment.select(&CONTENT_ID_SELECTOR).next())
        .or_else(|| fragment.select(&CONTENT_CLASS_SELECTOR).next());
    if let Some(main) = main {
        let content = trimmed_text(main);
        if content.chars().count() > 200 {
            let mut r = Resource::inline(page_url, content, ResourceType::Text, "Page Content", page_url);
            r.metadata.insert("type".to_string(), "general_content".to_string());
            return vec![r];
        }
    }

    Vec::new()
}

fn extract_quotes(fragment: &Html, page_url: &str) -> Vec<Resource> {
    let mut quotes = Vec::new();
    for quote_el in fragment.select(&QUOTE_SELECTOR) {
        let Some(text_el) = quote_el.select(&QUOTE_TEXT_SELECTOR).next() else {
            continue;
        };
        let content = trimmed_text(text_el);
        let author = quote_el
            .select(&QUOTE_AUTHOR_SELECTOR)
            .next()
            .map(trimmed_text)
            .unwrap_or_else(|| "Unknown".to_string());
        let tags: Vec<String> = quote_el.select(&QUOTE_TAG_SELECTOR).map(trimmed_text).collect();

        let mut r = Resource::inline(
            page_url,
            content,
            ResourceType::RichText,
            format!("Quote by {author}"),
            page_url,
        );
        r.metadata.insert("author".to_string(), author);
        r.metadata.insert("tags".to_string(), tags.join(","));
        r.metadata.insert("type".to_string(), "quote".to_string());
        quotes.push(r);
    }
    quotes
}

/// Pull `<title>` text from the full document, for article title fallback.
#[must_use]
pub fn page_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quote_blocks_with_metadata() {
        let html = r#"
            <div class="quote"><span class="text">Be yourself.</span>
                <small class="author">Oscar Wilde</small>
                <a class="tag">wisdom</a><a class="tag">life</a></div>
        "#;
        let doc = Html::parse_fragment(html);
        let resources = extract_text_content(&doc, None, "https://example.com/");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].metadata.get("author").unwrap(), "Oscar Wilde");
        assert_eq!(resources[0].metadata.get("tags").unwrap(), "wisdom,life");
    }

    #[test]
    fn article_over_100_chars_wins_when_no_quotes() {
        let long_text = "x".repeat(150);
        let html = format!("<article><p>{long_text}</p></article>");
        let doc = Html::parse_fragment(&html);
        let resources = extract_text_content(&doc, Some("My Title"), "https://example.com/");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].title, "My Title");
    }

    #[test]
    fn short_article_falls_through_to_empty() {
        let html = "<article><p>too short</p></article>";
        let doc = Html::parse_fragment(html);
        let resources = extract_text_content(&doc, None, "https://example.com/");
        assert!(resources.is_empty());
    }
}
