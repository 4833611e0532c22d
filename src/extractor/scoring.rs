//! Main-content scoring: select the most content-dense block of an HTML
//! document, so the rest of extraction runs against it instead of the
//! whole page (sidebars, nav, footers, ads excluded).

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

const POSITIVE_KEYWORDS: &[&str] = &["content", "article", "main", "post", "entry", "text", "body"];
const NEGATIVE_KEYWORDS: &[&str] = &[
    "sidebar", "footer", "nav", "menu", "ads", "ad", "comment", "aside", "widget",
];

static CANDIDATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div, article, section, main")
        .expect("BUG: hardcoded CSS selector is invalid")
});
static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("BUG: hardcoded CSS selector is invalid"));
static H2_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("BUG: hardcoded CSS selector is invalid"));
static P_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("BUG: hardcoded CSS selector is invalid"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("BUG: hardcoded CSS selector is invalid"));

/// Score a single candidate block per the heuristic in §4.3.
fn score_content_block(block: ElementRef<'_>) -> i32 {
    let mut score = 0i32;

    let classes = block
        .value()
        .attr("class")
        .unwrap_or_default()
        .to_ascii_lowercase();

    for keyword in POSITIVE_KEYWORDS {
        if classes.contains(keyword) {
            score += 10;
        }
    }
    for keyword in NEGATIVE_KEYWORDS {
        if classes.contains(keyword) {
            score -= 20;
        }
    }

    let h1_count = block.select(&H1_SELECTOR).count() as i32;
    let h2_count = block.select(&H2_SELECTOR).count() as i32;
    let p_count = block.select(&P_SELECTOR).count() as i32;
    let img_count = block.select(&IMG_SELECTOR).count() as i32;

    score += h1_count * 10;
    score += h2_count * 5;
    score += p_count * 2;
    score += img_count * 3;

    let text_length = block.text().collect::<String>().trim().chars().count();
    if text_length < 50 {
        score -= 10;
    } else if text_length > 500 {
        score += 15;
    }

    score
}

/// Select the highest-scoring content block's inner HTML. Falls back to
/// the full document HTML when no candidate scores ≥ 0.
#[must_use]
pub fn extract_main_content(document: &Html) -> String {
    let mut best_html: Option<String> = None;
    let mut best_score = -1000i32;

    for block in document.select(&CANDIDATE_SELECTOR) {
        let score = score_content_block(block);
        if score > best_score {
            best_score = score;
            best_html = Some(block.html());
        }
    }

    if best_score < 0 {
        return document.root_element().html();
    }

    best_html.unwrap_or_else(|| document.root_element().html())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_block_beats_sidebar_of_equal_text_length() {
        let html = r#"
            <html><body>
                <div class="sidebar"><p>Lorem ipsum dolor sit amet consectetur.</p></div>
                <div class="content"><p>Lorem ipsum dolor sit amet consectetur.</p></div>
            </body></html>
        "#;
        let doc = Html::parse_document(html);
        let main = extract_main_content(&doc);
        assert!(main.contains("class=\"content\""));
        assert!(!main.contains("sidebar"));
    }

    #[test]
    fn negative_overall_score_falls_back_to_full_document() {
        let html = r#"<html><body><div class="footer nav">x</div></body></html>"#;
        let doc = Html::parse_document(html);
        let main = extract_main_content(&doc);
        assert!(main.contains("footer"));
    }

    #[test]
    fn headings_and_paragraphs_increase_score() {
        let html = r#"
            <html><body>
                <div class="a"><p>short</p></div>
                <article class="b"><h1>Title</h1><p>one</p><p>two</p><p>three</p></article>
            </body></html>
        "#;
        let doc = Html::parse_document(html);
        let main = extract_main_content(&doc);
        assert!(main.contains("<h1>Title</h1>"));
    }
}
