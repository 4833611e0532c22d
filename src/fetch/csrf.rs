//! CSRF token discovery for login forms.

use scraper::{Html, Selector};

use crate::utils::constants::CSRF_FIELD_NAMES;

/// Find a CSRF token on a login page and the form field name it belongs
/// under. Checks known field names by `name` then `id` attribute, then
/// falls back to a `<meta name="csrf-...">` tag.
#[must_use]
pub fn extract_csrf_token(document: &Html) -> Option<(String, String)> {
    for field in CSRF_FIELD_NAMES {
        if let Some(value) = input_value_by_attr(document, "name", field) {
            return Some(((*field).to_string(), value));
        }
        if let Some(value) = input_value_by_attr(document, "id", field) {
            return Some(((*field).to_string(), value));
        }
    }

    meta_csrf_value(document).map(|value| (CSRF_FIELD_NAMES[0].to_string(), value))
}

fn input_value_by_attr(document: &Html, attr: &str, value: &str) -> Option<String> {
    let selector_str = format!(r#"input[{attr}="{value}"]"#);
    let selector = Selector::parse(&selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("value"))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn meta_csrf_value(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta").ok()?;
    document
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.to_ascii_lowercase().contains("csrf"))
        })
        .and_then(|el| el.value().attr("content"))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_token_by_name_attribute() {
        let html = r#"<form><input name="csrf_token" value="abc123"></form>"#;
        let doc = Html::parse_document(html);
        let (field, token) = extract_csrf_token(&doc).unwrap();
        assert_eq!(field, "csrf_token");
        assert_eq!(token, "abc123");
    }

    #[test]
    fn falls_back_to_meta_tag() {
        let html = r#"<meta name="csrf-token" content="xyz789">"#;
        let doc = Html::parse_document(html);
        let (_, token) = extract_csrf_token(&doc).unwrap();
        assert_eq!(token, "xyz789");
    }

    #[test]
    fn returns_none_when_absent() {
        let doc = Html::parse_document("<html><body>no form here</body></html>");
        assert!(extract_csrf_token(&doc).is_none());
    }
}
