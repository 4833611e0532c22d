//! Turns a fetched response into `(resources, pagination links)`.
//!
//! Dispatches on content type (HTML vs. JSON) and delegates to the
//! sub-modules below for each extraction strategy.

pub mod media;
pub mod pagination;
pub mod scoring;
pub mod script_sniff;
pub mod text;

use scraper::Html;
use url::Url;

use crate::model::{Resource, ResourceCategory, ResourceType};

/// One page's extraction result.
#[derive(Debug, Default)]
pub struct ExtractResult {
    pub resources: Vec<(ResourceCategory, Resource)>,
    pub pagination_links: Vec<String>,
}

/// Extract resources and pagination links from a fetched page body.
///
/// `final_url` is the response's post-redirect URL, used as the
/// resolution base for every relative link.
#[must_use]
pub fn extract(body: &str, content_type: &str, final_url: &str, status_code: u16) -> ExtractResult {
    if content_type.to_ascii_lowercase().contains("application/json") {
        return extract_json(body, final_url, status_code);
    }
    extract_html(body, final_url)
}

fn extract_json(body: &str, final_url: &str, status_code: u16) -> ExtractResult {
    let pretty = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(e) => {
            log::warn!("failed to parse JSON response from {final_url}: {e}");
            return ExtractResult::default();
        }
    };

    let mut resource = Resource::inline(final_url, pretty, ResourceType::Json, "API Response", final_url);
    resource
        .metadata
        .insert("status_code".to_string(), status_code.to_string());

    ExtractResult {
        resources: vec![(ResourceCategory::Documents, resource)],
        pagination_links: Vec::new(),
    }
}

fn extract_html(body: &str, final_url: &str) -> ExtractResult {
    let Ok(base) = Url::parse(final_url) else {
        log::warn!("cannot parse final URL {final_url}, skipping extraction");
        return ExtractResult::default();
    };

    let document = Html::parse_document(body);
    let title = text::page_title(&document);

    let main_html = scoring::extract_main_content(&document);
    let main_fragment = Html::parse_fragment(&main_html);

    let mut resources = Vec::new();

    let (videos, hls) = media::extract_videos(&main_fragment, &base, final_url);
    resources.extend(videos.into_iter().map(|r| (ResourceCategory::Videos, r)));
    resources.extend(hls.into_iter().map(|r| (ResourceCategory::HlsPlaylists, r)));

    for image in media::extract_images(&main_fragment, &base, final_url) {
        resources.push((ResourceCategory::Images, image));
    }
    for audio in media::extract_audio(&main_fragment, &base, final_url) {
        resources.push((ResourceCategory::Audios, audio));
    }
    for file in media::extract_anchor_files(&main_fragment, &base, final_url) {
        let category = match file.resource_type {
            ResourceType::Image => ResourceCategory::Images,
            ResourceType::Video => ResourceCategory::Videos,
            ResourceType::Audio => ResourceCategory::Audios,
            ResourceType::HlsPlaylist => ResourceCategory::HlsPlaylists,
            _ => ResourceCategory::Documents,
        };
        resources.push((category, file));
    }

    for text_resource in text::extract_text_content(&main_fragment, title.as_deref(), final_url) {
        resources.push((ResourceCategory::Documents, text_resource));
    }

    for json_resource in script_sniff::sniff_script_json(&document) {
        resources.push((ResourceCategory::Documents, json_resource));
    }

    let pagination_links = pagination::get_pagination_links(&document, &base);

    ExtractResult {
        resources,
        pagination_links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_type_yields_single_document_resource() {
        let result = extract(r#"{"ua":"X"}"#, "application/json", "https://example.com/", 200);
        assert_eq!(result.resources.len(), 1);
        let (category, resource) = &result.resources[0];
        assert_eq!(*category, ResourceCategory::Documents);
        assert_eq!(resource.resource_type, ResourceType::Json);
        assert!(resource.content.starts_with('{'));
    }

    #[test]
    fn html_with_media_and_pagination() {
        let html = r#"
            <html><body>
                <div class="content">
                    <img src="/a.jpg" width="300" height="300">
                    <img src="/b.jpg" width="300" height="300">
                    <video src="/clip.mp4"></video>
                    <a href="/stream.m3u8">Stream</a>
                </div>
                <li class="next"><a href="/page/2/">Next</a></li>
            </body></html>
        "#;
        let result = extract(html, "text/html", "https://example.com/", 200);
        let images = result
            .resources
            .iter()
            .filter(|(c, _)| *c == ResourceCategory::Images)
            .count();
        let videos = result
            .resources
            .iter()
            .filter(|(c, _)| *c == ResourceCategory::Videos)
            .count();
        let hls = result
            .resources
            .iter()
            .filter(|(c, _)| *c == ResourceCategory::HlsPlaylists)
            .count();
        assert_eq!(images, 2);
        assert_eq!(videos, 1);
        assert_eq!(hls, 1);
        assert_eq!(result.pagination_links, vec!["https://example.com/page/2/".to_string()]);
    }
}
