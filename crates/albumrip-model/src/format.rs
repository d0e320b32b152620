use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::asset::url_has_extension;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("audio format name is empty")]
    Empty,

    #[error("audio format name '{0}' must be alphanumeric (e.g. \"flac\", \"mp3\")")]
    InvalidName(String),
}

/// The audio format selected from the album's track table.
///
/// `label` is the column header text (e.g. `FLAC`); `extension` is the file
/// suffix a direct asset link ends with, including the dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetFormat {
    pub label: String,
    pub extension: String,
}

impl TargetFormat {
    pub fn flac() -> Self {
        Self {
            label: "FLAC".to_string(),
            extension: ".flac".to_string(),
        }
    }

    /// Whether `url` points directly at a file of this format.
    pub fn matches_url(&self, url: &Url) -> bool {
        url_has_extension(url, &[self.extension.as_str()])
    }

    /// Whether a raw (possibly relative) href ends with this format's extension.
    pub fn matches_href(&self, href: &str) -> bool {
        href.to_ascii_lowercase()
            .ends_with(&self.extension.to_ascii_lowercase())
    }
}

impl Default for TargetFormat {
    fn default() -> Self {
        Self::flac()
    }
}

impl FromStr for TargetFormat {
    type Err = FormatError;

    /// Parse a codec name such as `flac` or `.FLAC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('.');
        if name.is_empty() {
            return Err(FormatError::Empty);
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FormatError::InvalidName(s.to_string()));
        }
        Ok(Self {
            label: name.to_ascii_uppercase(),
            extension: format!(".{}", name.to_ascii_lowercase()),
        })
    }
}

impl TryFrom<String> for TargetFormat {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetFormat> for String {
    fn from(format: TargetFormat) -> Self {
        format.extension.trim_start_matches('.').to_string()
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codec_name() {
        assert_eq!("flac".parse::<TargetFormat>().unwrap(), TargetFormat::flac());
        assert_eq!(".FLAC".parse::<TargetFormat>().unwrap(), TargetFormat::flac());

        let mp3: TargetFormat = "mp3".parse().unwrap();
        assert_eq!(mp3.label, "MP3");
        assert_eq!(mp3.extension, ".mp3");
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert_eq!("".parse::<TargetFormat>(), Err(FormatError::Empty));
        assert_eq!(" . ".parse::<TargetFormat>(), Err(FormatError::Empty));
        assert!(matches!(
            "fl/ac".parse::<TargetFormat>(),
            Err(FormatError::InvalidName(_))
        ));
    }

    #[test]
    fn test_matches() {
        let flac = TargetFormat::flac();
        let u = Url::parse("https://x.com/a/01%20Intro.FLAC").unwrap();
        assert!(flac.matches_url(&u));
        assert!(flac.matches_href("/a/01.flac"));
        assert!(!flac.matches_href("/a/01.mp3"));
    }
}
