use std::path::{Path, PathBuf};
use url::Url;

use crate::sanitize::sanitize_name;

/// Directory name used when neither the page title nor an override yields
/// a usable name.
pub const FALLBACK_DIR_NAME: &str = "album";

/// Subdirectory of the album directory that receives artwork.
pub const IMAGES_DIR_NAME: &str = "images";

/// One album being downloaded. Title and directory are fixed once derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub url: Url,
    pub title: String,
    pub output_dir: PathBuf,
}

impl Album {
    /// Build an album from its page `<title>` text.
    ///
    /// The output directory is `base_dir` joined with the sanitized override
    /// if one is given, otherwise with the derived title.
    pub fn new(url: Url, raw_title: &str, base_dir: &Path, output_override: Option<&str>) -> Self {
        let title = title_from_page_title(raw_title);
        let dir_name = output_dir_name(&title, output_override);
        Self {
            url,
            title,
            output_dir: base_dir.join(dir_name),
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIR_NAME)
    }
}

/// Album title from a page title such as `"Foo Bar - Lossless"`.
///
/// Keeps the part before the first `" - "` and sanitizes it.
pub fn title_from_page_title(raw: &str) -> String {
    let head = raw.split(" - ").next().unwrap_or_default();
    sanitize_name(head)
}

/// Name of the album directory: the override if non-empty, else the title.
pub fn output_dir_name(title: &str, output_override: Option<&str>) -> String {
    let chosen = output_override
        .map(sanitize_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| title.to_string());

    if chosen.is_empty() || chosen == "." || chosen == ".." {
        FALLBACK_DIR_NAME.to_string()
    } else {
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album_url() -> Url {
        Url::parse("https://downloads.example.com/game-soundtracks/album/foo-bar").unwrap()
    }

    #[test]
    fn test_title_from_page_title() {
        assert_eq!(title_from_page_title("Foo Bar - Lossless"), "Foo Bar");
        assert_eq!(
            title_from_page_title("Foo: Bar - MP3 - Download"),
            "Foo- Bar"
        );
        assert_eq!(title_from_page_title("No Separator"), "No Separator");
        assert_eq!(title_from_page_title(""), "");
    }

    #[test]
    fn test_output_dir_from_title() {
        let album = Album::new(album_url(), "Foo Bar - Lossless", Path::new("/music"), None);
        assert_eq!(album.title, "Foo Bar");
        assert_eq!(album.output_dir, PathBuf::from("/music/Foo Bar"));
        assert_eq!(album.images_dir(), PathBuf::from("/music/Foo Bar/images"));
    }

    #[test]
    fn test_output_dir_override_wins() {
        let album = Album::new(
            album_url(),
            "Foo Bar - Lossless",
            Path::new("/music"),
            Some("custom"),
        );
        assert_eq!(album.title, "Foo Bar");
        assert_eq!(album.output_dir, PathBuf::from("/music/custom"));
    }

    #[test]
    fn test_output_dir_fallbacks() {
        assert_eq!(output_dir_name("", None), FALLBACK_DIR_NAME);
        assert_eq!(output_dir_name("", Some("  ")), FALLBACK_DIR_NAME);
        assert_eq!(output_dir_name("Title", Some("")), "Title");
        assert_eq!(output_dir_name("..", None), FALLBACK_DIR_NAME);
        assert_eq!(output_dir_name("Title", Some("a/b")), "a-b");
    }
}
