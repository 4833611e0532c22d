//! Image, video, audio, and HLS playlist extraction, plus anchor-extension
//! classification for links that point directly at a media or document
//! file.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::model::{Resource, ResourceType};

static VIDEO_SOURCE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("video, source").expect("BUG: hardcoded selector"));
static AUDIO_SOURCE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("audio, source").expect("BUG: hardcoded selector"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("BUG: hardcoded selector"));
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("BUG: hardcoded selector"));
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("BUG: hardcoded selector"));

static M3U8_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"'>]+\.m3u8[^\s"']*"#).expect("BUG: hardcoded regex")
});

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];
const VIDEO_EXTS: &[&str] = &["mp4", "webm", "mkv", "avi", "mov"];
const AUDIO_EXTS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a"];
const DOCUMENT_EXTS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip"];

/// Resolve `href` against `base`, skipping non-http(s) and pseudo schemes.
fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }
    if let Some(data) = href.strip_prefix("data:") {
        let _ = data;
        return Some(href.to_string());
    }
    base.join(href).ok().and_then(|u| {
        matches!(u.scheme(), "http" | "https").then(|| u.to_string())
    })
}

fn first_attr<'a>(el: &scraper::ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| el.value().attr(name))
}

/// Extract `<video>`/`<source>` elements, `.m3u8` anchors, and `.m3u8`
/// occurrences in script bodies.
pub fn extract_videos(fragment: &Html, base: &Url, referer: &str) -> (Vec<Resource>, Vec<Resource>) {
    let mut videos = Vec::new();
    let mut hls = Vec::new();

    for el in fragment.select(&VIDEO_SOURCE_SELECTOR) {
        if let Some(src) = first_attr(&el, &["src", "data-src"]) {
            if let Some(url) = resolve(base, src) {
                let title = first_attr(&el, &["title", "alt"]).unwrap_or_default();
                videos.push(Resource::from_url(url, ResourceType::Video, referer).with_title(title));
            }
        }
    }

    for el in fragment.select(&ANCHOR_SELECTOR) {
        if let Some(href) = el.value().attr("href") {
            if href.to_ascii_lowercase().contains(".m3u8") {
                if let Some(url) = resolve(base, href) {
                    let title = el.text().collect::<String>().trim().to_string();
                    hls.push(Resource::from_url(url, ResourceType::HlsPlaylist, referer).with_title(title));
                }
            }
        }
    }

    for script in fragment.select(&SCRIPT_SELECTOR) {
        let body = script.text().collect::<String>();
        for m in M3U8_PATTERN.find_iter(&body) {
            hls.push(Resource::from_url(m.as_str(), ResourceType::HlsPlaylist, referer));
        }
    }

    (dedupe(videos), dedupe(hls))
}

/// Extract `<img>` elements, skipping ones explicitly sized under 100px
/// in both dimensions.
pub fn extract_images(fragment: &Html, base: &Url, referer: &str) -> Vec<Resource> {
    let mut images = Vec::new();

    for el in fragment.select(&IMG_SELECTOR) {
        let Some(src) = first_attr(&el, &["src", "data-src", "data-lazy-src"]) else {
            continue;
        };
        let Some(url) = resolve(base, src) else {
            continue;
        };

        if let (Some(w), Some(h)) = (el.value().attr("width"), el.value().attr("height")) {
            if let (Ok(w), Ok(h)) = (w.parse::<u32>(), h.parse::<u32>()) {
                if w < 100 || h < 100 {
                    continue;
                }
            }
        }

        let title = first_attr(&el, &["alt", "title"]).unwrap_or_default();
        images.push(Resource::from_url(url, ResourceType::Image, referer).with_title(title));
    }

    dedupe(images)
}

/// Extract `<audio>`/`<source>` elements.
pub fn extract_audio(fragment: &Html, base: &Url, referer: &str) -> Vec<Resource> {
    let mut audios = Vec::new();
    for el in fragment.select(&AUDIO_SOURCE_SELECTOR) {
        if let Some(src) = first_attr(&el, &["src"]) {
            if let Some(url) = resolve(base, src) {
                audios.push(Resource::from_url(url, ResourceType::Audio, referer));
            }
        }
    }
    dedupe(audios)
}

/// Classify anchors pointing at known binary file extensions into their
/// resource category, for anchors not otherwise captured above.
pub fn extract_anchor_files(fragment: &Html, base: &Url, referer: &str) -> Vec<Resource> {
    let mut found = Vec::new();
    for el in fragment.select(&ANCHOR_SELECTOR) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve(base, href) else {
            continue;
        };
        let Some(ext) = std::path::Path::new(url.split(['?', '#']).next().unwrap_or(&url))
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
        else {
            continue;
        };

        let resource_type = if IMAGE_EXTS.contains(&ext.as_str()) {
            ResourceType::Image
        } else if VIDEO_EXTS.contains(&ext.as_str()) {
            ResourceType::Video
        } else if AUDIO_EXTS.contains(&ext.as_str()) {
            ResourceType::Audio
        } else if ext == "m3u8" {
            ResourceType::HlsPlaylist
        } else if DOCUMENT_EXTS.contains(&ext.as_str()) {
            ResourceType::Document
        } else {
            continue;
        };

        found.push(Resource::from_url(url, resource_type, referer));
    }
    dedupe(found)
}

fn dedupe(resources: Vec<Resource>) -> Vec<Resource> {
    let mut seen = std::collections::HashSet::new();
    resources
        .into_iter()
        .filter(|r| r.is_inline() || seen.insert(r.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(html: &str) -> (Html, Url) {
        (Html::parse_fragment(html), Url::parse("https://example.com/page").unwrap())
    }

    #[test]
    fn extracts_large_images_only() {
        let (doc, base) = fragment(
            r#"<div><img src="a.jpg" width="200" height="200"><img src="b.jpg" width="50" height="50"></div>"#,
        );
        let images = extract_images(&doc, &base, "https://example.com/page");
        assert_eq!(images.len(), 1);
        assert!(images[0].url.ends_with("a.jpg"));
    }

    #[test]
    fn extracts_video_and_hls_anchor() {
        let (doc, base) = fragment(
            r#"<div><video src="clip.mp4"></video><a href="stream.m3u8">Watch</a></div>"#,
        );
        let (videos, hls) = extract_videos(&doc, &base, "https://example.com/page");
        assert_eq!(videos.len(), 1);
        assert_eq!(hls.len(), 1);
    }

    #[test]
    fn finds_m3u8_url_inside_script_body() {
        let (doc, base) = fragment(
            r#"<div><script>var src = "https://cdn.example.com/stream.m3u8?token=abc";</script></div>"#,
        );
        let (_, hls) = extract_videos(&doc, &base, "https://example.com/page");
        assert_eq!(hls.len(), 1);
        assert!(hls[0].url.contains("stream.m3u8"));
    }
}
