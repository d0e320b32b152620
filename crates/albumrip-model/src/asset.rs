use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::sanitize::sanitize_name;

/// Which loop of the pipeline an asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Track,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => f.write_str("image"),
            AssetKind::Track => f.write_str("track"),
        }
    }
}

/// A thumbnail anchor found on the album page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLink {
    /// Anchor target, resolved against the album page URL.
    pub target: Url,
    /// True when the anchor points at another album listing rather than
    /// this album's own artwork.
    pub excluded: bool,
}

/// A row of the album's track table that offers the target format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    /// 1-based position among qualifying rows, in table order.
    pub position: usize,
    /// Either a direct asset URL or a detail page that links to it.
    pub link: Url,
}

/// A final downloadable URL and where it goes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub kind: AssetKind,
    pub url: Url,
    /// Page that linked to `url`; sent as the `Referer` header.
    pub referer: Url,
    pub destination: PathBuf,
}

/// Per-asset result of a download attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// Destination already existed; nothing was requested.
    Skipped,
    Downloaded { bytes: u64 },
    Failed { reason: String },
}

/// Derive a safe local file name from an asset URL.
///
/// Takes the last non-empty path segment, percent-decodes it and runs it
/// through [`sanitize_name`]. Query strings and fragments are ignored.
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?;

    let decoded = match urlencoding::decode(segment) {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes()))
            .into_owned(),
    };

    let name = sanitize_name(&decoded);
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

/// True when the URL's path ends with one of `extensions` (case-insensitive).
///
/// Extensions are given with their leading dot, e.g. `".flac"`.
pub fn url_has_extension(url: &Url, extensions: &[&str]) -> bool {
    let path = url.path().to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_file_name_percent_decoded() {
        let u = url("https://cdn.example.com/soundtracks/foo/01/My%20Song.flac");
        assert_eq!(file_name_from_url(&u).as_deref(), Some("My Song.flac"));
    }

    #[test]
    fn test_file_name_sanitized_after_decoding() {
        // %3A is ':' and %3F is '?', both illegal once decoded
        let u = url("https://cdn.example.com/a/What%3F%20Now%3A%20Remix.flac");
        assert_eq!(
            file_name_from_url(&u).as_deref(),
            Some("What- Now- Remix.flac")
        );
    }

    #[test]
    fn test_file_name_ignores_query_and_trailing_slash() {
        let u = url("https://cdn.example.com/a/cover.jpg?size=large#top");
        assert_eq!(file_name_from_url(&u).as_deref(), Some("cover.jpg"));

        let u = url("https://cdn.example.com/a/scans/");
        assert_eq!(file_name_from_url(&u).as_deref(), Some("scans"));
    }

    #[test]
    fn test_file_name_none_for_root() {
        assert_eq!(file_name_from_url(&url("https://example.com/")), None);
        assert_eq!(file_name_from_url(&url("https://example.com")), None);
    }

    #[test]
    fn test_file_name_invalid_utf8_is_lossy() {
        let u = url("https://example.com/a/bad%FFname.flac");
        let name = file_name_from_url(&u).unwrap();
        assert!(name.starts_with("bad"));
        assert!(name.ends_with("name.flac"));
    }

    #[test]
    fn test_url_has_extension_case_insensitive() {
        let exts = [".jpg", ".jpeg", ".png", ".gif"];
        assert!(url_has_extension(&url("https://x.com/a/Cover.JPG"), &exts));
        assert!(url_has_extension(&url("https://x.com/a/b.png?x=1"), &exts));
        assert!(!url_has_extension(&url("https://x.com/a/b.png.html"), &exts));
        assert!(!url_has_extension(&url("https://x.com/album/foo"), &exts));
    }
}
