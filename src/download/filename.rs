//! Target filename derivation and uniqueness handling for downloaded
//! resources.

use std::path::{Path, PathBuf};

use url::Url;

use crate::model::{Resource, ResourceType};
use crate::utils::constants::MAX_TITLE_FILENAME_LEN;

fn guess_extension(url: &str, resource_type: ResourceType) -> &'static str {
    if let Some(path) = url.split(['?', '#']).next() {
        if let Some(dot) = path.rfind('.') {
            let candidate = &path[dot + 1..];
            if !candidate.is_empty() && candidate.len() <= 5 && candidate.chars().all(char::is_alphanumeric) {
                return Box::leak(candidate.to_ascii_lowercase().into_boxed_str());
            }
        }
    }
    resource_type.default_extension()
}

/// Derive the target filename for a resource: the sanitized title if
/// short enough, else the URL's path basename, else a content hash.
#[must_use]
pub fn derive_filename(resource: &Resource) -> String {
    if !resource.title.is_empty() && resource.title.chars().count() < MAX_TITLE_FILENAME_LEN {
        let mut name = sanitize_filename::sanitize(&resource.title);
        if !name.contains('.') {
            name.push_str(guess_extension(&resource.url, resource.resource_type));
            return name;
        }
        if !name.is_empty() {
            return name;
        }
    }

    if let Some(basename) = url_basename(&resource.url) {
        return sanitize_filename::sanitize(&basename);
    }

    let hash = xxhash_rust::xxh3::xxh3_64(resource.url.as_bytes());
    format!("file_{:010x}", hash & 0xFF_FFFF_FFFF)
}

fn url_basename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let decoded = urlencoding::decode(parsed.path()).ok()?.into_owned();
    let name = decoded.rsplit('/').next()?.to_string();
    if name.is_empty() || name.chars().count() > 100 {
        return None;
    }
    Some(name)
}

/// Append `_1`, `_2`, ... before the extension until `dir/name` doesn't
/// already exist.
#[must_use]
pub fn ensure_unique(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str());

    let mut counter = 1u32;
    loop {
        let name = match ext {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = dir.join(&name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceStatus;
    use tempfile::TempDir;

    fn resource(url: &str, title: &str, resource_type: ResourceType) -> Resource {
        Resource {
            url: url.to_string(),
            resource_type,
            title: title.to_string(),
            extension: String::new(),
            referer: String::new(),
            headers: Default::default(),
            size: None,
            content: String::new(),
            metadata: Default::default(),
            status: ResourceStatus::Pending,
            progress: 0.0,
            error: None,
            local_path: None,
        }
    }

    #[test]
    fn prefers_short_sanitized_title_with_guessed_extension() {
        let r = resource("https://example.com/a/b.jpg", "My Photo", ResourceType::Image);
        assert_eq!(derive_filename(&r), "My Photo.jpg");
    }

    #[test]
    fn falls_back_to_url_basename_when_no_title() {
        let r = resource("https://example.com/path/to/image.png", "", ResourceType::Image);
        assert_eq!(derive_filename(&r), "image.png");
    }

    #[test]
    fn falls_back_to_hash_when_no_usable_path() {
        let r = resource("https://example.com/", "", ResourceType::Image);
        let name = derive_filename(&r);
        assert!(name.starts_with("file_"));
    }

    #[test]
    fn ensure_unique_appends_counter_on_collision() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        let unique = ensure_unique(dir.path(), "a.jpg");
        assert_eq!(unique.file_name().unwrap().to_str().unwrap(), "a_1.jpg");
    }

    #[test]
    fn ensure_unique_returns_original_when_absent() {
        let dir = TempDir::new().unwrap();
        let unique = ensure_unique(dir.path(), "new.jpg");
        assert_eq!(unique.file_name().unwrap().to_str().unwrap(), "new.jpg");
    }
}
