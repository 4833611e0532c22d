//! Core data types shared across the crawl and download pipelines.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::constants::MAX_TITLE_FILENAME_LEN;

/// Resource type classification, driving extension inference and download
/// category assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Image,
    Video,
    Audio,
    HlsPlaylist,
    Document,
    Text,
    Json,
    RichText,
    Unknown,
}

impl ResourceType {
    /// Extension fallback used when a resource's URL carries none, per
    /// the download pipeline's step 1 (§4.6).
    #[must_use]
    pub const fn default_extension(self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Video | Self::HlsPlaylist => "mp4",
            Self::Audio => "mp3",
            Self::Text | Self::Json | Self::RichText => "txt",
            Self::Document | Self::Unknown => "dat",
        }
    }

    /// Infer a type from a file extension (case-insensitive, no leading dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" | "svg" => Self::Image,
            "mp4" | "webm" | "mkv" | "avi" | "mov" => Self::Video,
            "mp3" | "wav" | "ogg" | "flac" | "m4a" => Self::Audio,
            "m3u8" => Self::HlsPlaylist,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "zip" => Self::Document,
            "json" => Self::Json,
            "txt" | "md" => Self::Text,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::HlsPlaylist => "hls_playlist",
            Self::Document => "document",
            Self::Text => "text",
            Self::Json => "json",
            Self::RichText => "rich_text",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ResourceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "hls_playlist" => Self::HlsPlaylist,
            "document" => Self::Document,
            "text" => Self::Text,
            "json" => Self::Json,
            "rich_text" => Self::RichText,
            _ => Self::Unknown,
        })
    }
}

/// Lifecycle status of a `Resource` during download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A single discovered item, network-bearing or inline.
///
/// Invariant: `url` may be empty only when `content` is non-empty (an
/// inline text/JSON resource produced by script sniffing or quote
/// extraction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub resource_type: ResourceType,
    pub title: String,
    pub extension: String,
    pub referer: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub size: Option<u64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub status: ResourceStatus,
    pub progress: f32,
    pub error: Option<String>,
    pub local_path: Option<String>,
}

impl Resource {
    /// Construct a network-bearing resource, inferring title and extension
    /// from the URL when not otherwise known.
    #[must_use]
    pub fn from_url(url: impl Into<String>, resource_type: ResourceType, referer: &str) -> Self {
        let url = url.into();
        let extension = extract_extension(&url).unwrap_or_default();
        let title = generate_title(&url);
        Self {
            url,
            resource_type,
            title,
            extension,
            referer: referer.to_string(),
            headers: HashMap::new(),
            size: None,
            content: String::new(),
            metadata: HashMap::new(),
            status: ResourceStatus::Pending,
            progress: 0.0,
            error: None,
            local_path: None,
        }
    }

    /// Construct an inline-content resource (script-sniffed JSON, quote
    /// blocks, structured text). `url` may be empty (script sniffing has
    /// no natural URL) or the page's own URL (quotes/article/text are
    /// associated with the page that produced them).
    #[must_use]
    pub fn inline(
        url: impl Into<String>,
        content: impl Into<String>,
        resource_type: ResourceType,
        title: impl Into<String>,
        referer: &str,
    ) -> Self {
        Self {
            url: url.into(),
            resource_type,
            title: title.into(),
            extension: resource_type.default_extension().to_string(),
            referer: referer.to_string(),
            headers: HashMap::new(),
            size: None,
            content: content.into(),
            metadata: HashMap::new(),
            status: ResourceStatus::Pending,
            progress: 0.0,
            error: None,
            local_path: None,
        }
    }

    /// Whether this resource carries its value inline (text/JSON already
    /// captured at extraction time) rather than needing a later fetch.
    /// Inline resources are exempt from per-category URL dedup, since
    /// several can legitimately share a URL (e.g. one page, many quotes)
    /// or carry none at all (script-sniffed JSON).
    /// Override the inferred title when the caller has a better one
    /// (e.g. an `alt`/`title` attribute from the source element).
    #[must_use]
    pub fn with_title(mut self, title: impl AsRef<str>) -> Self {
        let title = title.as_ref();
        if !title.is_empty() {
            self.title = title.to_string();
        }
        self
    }

    #[must_use]
    pub fn is_inline(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn mark_progress(&mut self, progress: f32) {
        self.status = ResourceStatus::Downloading;
        self.progress = progress.clamp(0.0, 1.0);
    }

    pub fn mark_completed(&mut self, local_path: impl Into<String>, file_size: u64) {
        self.status = ResourceStatus::Completed;
        self.progress = 1.0;
        self.local_path = Some(local_path.into());
        self.size = Some(file_size);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = ResourceStatus::Failed;
        self.error = Some(error.into());
    }
}

fn extract_extension(url: &str) -> Option<String> {
    let path = Url::parse(url).ok().map_or_else(
        || url.to_string(),
        |u| u.path().to_string(),
    );
    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn generate_title(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segs| segs.next_back())
                .filter(|s| !s.is_empty())
                .map(std::string::ToString::to_string)
        })
        .unwrap_or_else(|| url.to_string())
        .chars()
        .take(MAX_TITLE_FILENAME_LEN)
        .collect()
}

/// Queue priority, ascending (HIGH dequeues first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High = 1,
    Normal = 2,
    Low = 3,
}

/// A unit of work inside the crawl pool: a page to fetch at a given depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
    /// 1-based distance from the seed page.
    pub depth: u8,
    pub priority: Priority,
    pub referer: Option<String>,
}

impl CrawlTask {
    #[must_use]
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 1,
            priority: Priority::High,
            referer: None,
        }
    }

    #[must_use]
    pub fn child(url: impl Into<String>, depth: u8, referer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            priority: Priority::Normal,
            referer: Some(referer.into()),
        }
    }
}

/// Category partition of a `ScrapedData` aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    Images,
    Videos,
    Audios,
    HlsPlaylists,
    Documents,
}

impl ResourceCategory {
    pub const ALL: [Self; 5] = [
        Self::Images,
        Self::Videos,
        Self::Audios,
        Self::HlsPlaylists,
        Self::Documents,
    ];
}

/// Per-run aggregation: category-partitioned resource lists with
/// intra-category URL uniqueness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedData {
    pub source_url: String,
    pub images: Vec<Resource>,
    pub videos: Vec<Resource>,
    pub audios: Vec<Resource>,
    pub hls_playlists: Vec<Resource>,
    pub documents: Vec<Resource>,
}

impl ScrapedData {
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
            && self.videos.is_empty()
            && self.audios.is_empty()
            && self.hls_playlists.is_empty()
            && self.documents.is_empty()
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.images.len()
            + self.videos.len()
            + self.audios.len()
            + self.hls_playlists.len()
            + self.documents.len()
    }

    #[must_use]
    pub fn category(&self, category: ResourceCategory) -> &[Resource] {
        match category {
            ResourceCategory::Images => &self.images,
            ResourceCategory::Videos => &self.videos,
            ResourceCategory::Audios => &self.audios,
            ResourceCategory::HlsPlaylists => &self.hls_playlists,
            ResourceCategory::Documents => &self.documents,
        }
    }

    fn category_mut(&mut self, category: ResourceCategory) -> &mut Vec<Resource> {
        match category {
            ResourceCategory::Images => &mut self.images,
            ResourceCategory::Videos => &mut self.videos,
            ResourceCategory::Audios => &mut self.audios,
            ResourceCategory::HlsPlaylists => &mut self.hls_playlists,
            ResourceCategory::Documents => &mut self.documents,
        }
    }

    /// Add a resource to a category, deduplicating by URL. Inline
    /// (URL-less) resources always pass through unchanged.
    pub fn add(&mut self, category: ResourceCategory, resource: Resource) {
        let is_inline = resource.is_inline();
        let list = self.category_mut(category);
        if !is_inline && list.iter().any(|r| r.url == resource.url) {
            return;
        }
        list.push(resource);
    }

    #[must_use]
    pub fn get_category_counts(&self) -> HashMap<&'static str, usize> {
        [
            ("images", self.images.len()),
            ("videos", self.videos.len()),
            ("audios", self.audios.len()),
            ("hls_playlists", self.hls_playlists.len()),
            ("documents", self.documents.len()),
        ]
        .into_iter()
        .collect()
    }

    #[must_use]
    pub fn get_urls_by_category(&self, category: ResourceCategory) -> Vec<&str> {
        self.category(category)
            .iter()
            .filter(|r| !r.is_inline())
            .map(|r| r.url.as_str())
            .collect()
    }

    /// Flatten the selected categories, in category order, for dispatch to
    /// `DownloadPool`.
    #[must_use]
    pub fn resources_in_categories(&self, categories: &[ResourceCategory]) -> Vec<Resource> {
        categories
            .iter()
            .flat_map(|c| self.category(*c).iter().cloned())
            .collect()
    }

    pub fn merge(&mut self, other: ScrapedData) {
        for category in ResourceCategory::ALL {
            for resource in match category {
                ResourceCategory::Images => other.images.clone(),
                ResourceCategory::Videos => other.videos.clone(),
                ResourceCategory::Audios => other.audios.clone(),
                ResourceCategory::HlsPlaylists => other.hls_playlists.clone(),
                ResourceCategory::Documents => other.documents.clone(),
            } {
                self.add(category, resource);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_from_url_infers_extension_and_title() {
        let r = Resource::from_url("https://example.com/path/photo.JPG", ResourceType::Image, "https://example.com/");
        assert_eq!(r.extension, "jpg");
        assert_eq!(r.title, "photo.JPG");
        assert!(!r.is_inline());
    }

    #[test]
    fn inline_resource_may_have_empty_url() {
        let r = Resource::inline("", "{}", ResourceType::Json, "state", "https://example.com/");
        assert!(r.is_inline());
        assert_eq!(r.content, "{}");
    }

    #[test]
    fn scraped_data_dedupes_by_url_within_category() {
        let mut data = ScrapedData::new("https://example.com/");
        let r1 = Resource::from_url("https://example.com/a.jpg", ResourceType::Image, "https://example.com/");
        let r2 = Resource::from_url("https://example.com/a.jpg", ResourceType::Image, "https://example.com/");
        data.add(ResourceCategory::Images, r1);
        data.add(ResourceCategory::Images, r2);
        assert_eq!(data.images.len(), 1);
    }

    #[test]
    fn scraped_data_inline_resources_not_deduped_even_sharing_a_url() {
        let mut data = ScrapedData::new("https://example.com/");
        data.add(
            ResourceCategory::Documents,
            Resource::inline("https://example.com/", "a", ResourceType::RichText, "t", "https://example.com/"),
        );
        data.add(
            ResourceCategory::Documents,
            Resource::inline("https://example.com/", "b", ResourceType::RichText, "t", "https://example.com/"),
        );
        assert_eq!(data.documents.len(), 2);
    }
}
