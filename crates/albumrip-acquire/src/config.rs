use albumrip_model::TargetFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AcquireError, Result};
use crate::http::{HttpClient, DEFAULT_USER_AGENT};
use crate::resolve::DEFAULT_EXCLUDE_PATTERNS;
use crate::retry::RetryPolicy;

/// What the track loop does when one track cannot be resolved or downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log the failure and move on to the next track.
    #[default]
    Continue,
    /// Stop the run at the first failed track.
    Abort,
}

/// Everything the pipeline needs to know, passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the album directory is created in.
    pub base_dir: PathBuf,
    /// Album directory name to use instead of the page title.
    pub output_override: Option<String>,
    pub format: TargetFormat,
    pub page_timeout: Duration,
    /// Bound on waiting for an asset's headers and for each body chunk.
    pub download_timeout: Duration,
    /// Pause before each track, to go easy on the host.
    pub track_delay: Duration,
    pub error_policy: ErrorPolicy,
    pub retry: RetryPolicy,
    pub user_agent: String,
    /// Image links containing any of these are other albums, not artwork.
    pub exclude_patterns: Vec<String>,
    /// Write the album page to `album.html` in the album directory.
    pub save_html: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            output_override: None,
            format: TargetFormat::flac(),
            page_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            track_delay: Duration::from_millis(300),
            error_policy: ErrorPolicy::Continue,
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            save_html: false,
        }
    }
}

impl PipelineConfig {
    pub fn http_client(&self) -> Result<HttpClient> {
        HttpClient::new(&self.user_agent, self.page_timeout, self.download_timeout)
    }
}

/// Optional TOML settings file. Every field is optional; absent fields keep
/// the built-in defaults.
///
/// ```toml
/// base_dir = "/srv/music"
/// format = "flac"
/// on_error = "abort"
/// track_delay_ms = 1000
///
/// [retry]
/// max_attempts = 5
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub base_dir: Option<PathBuf>,
    pub format: Option<TargetFormat>,
    pub page_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub track_delay_ms: Option<u64>,
    pub on_error: Option<ErrorPolicy>,
    pub retry: Option<RetryPolicy>,
    pub user_agent: Option<String>,
    pub exclude_patterns: Option<Vec<String>>,
    pub save_html: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AcquireError::io("failed to read", path, e))?;
        Self::parse(&contents, path)
    }

    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e| AcquireError::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply(self, config: &mut PipelineConfig) {
        if let Some(base_dir) = self.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(secs) = self.page_timeout_secs {
            config.page_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.download_timeout_secs {
            config.download_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.track_delay_ms {
            config.track_delay = Duration::from_millis(ms);
        }
        if let Some(policy) = self.on_error {
            config.error_policy = policy;
        }
        if let Some(retry) = self.retry {
            config.retry = retry;
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        if let Some(patterns) = self.exclude_patterns {
            config.exclude_patterns = patterns;
        }
        if let Some(save_html) = self.save_html {
            config.save_html = save_html;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
base_dir = "/srv/music"
format = "mp3"
on_error = "abort"
track_delay_ms = 1500
page_timeout_secs = 10
exclude_patterns = []

[retry]
max_attempts = 5
base_delay = 100
"#;
        let file = ConfigFile::parse(toml_str, Path::new("albumrip.toml")).unwrap();
        let mut config = PipelineConfig::default();
        file.apply(&mut config);

        assert_eq!(config.base_dir, PathBuf::from("/srv/music"));
        assert_eq!(config.format.label, "MP3");
        assert_eq!(config.error_policy, ErrorPolicy::Abort);
        assert_eq!(config.track_delay, Duration::from_millis(1500));
        assert_eq!(config.page_timeout, Duration::from_secs(10));
        assert_eq!(config.download_timeout, Duration::from_secs(60));
        assert!(config.exclude_patterns.is_empty());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(100));
        assert_eq!(config.retry.max_delay, RetryPolicy::default().max_delay);
    }

    #[test]
    fn test_empty_config_keeps_defaults() {
        let file = ConfigFile::parse("", Path::new("empty.toml")).unwrap();
        let mut config = PipelineConfig::default();
        file.apply(&mut config);

        assert_eq!(config.format, TargetFormat::flac());
        assert_eq!(config.error_policy, ErrorPolicy::Continue);
        assert_eq!(config.exclude_patterns, vec!["/game-soundtracks/album/".to_string()]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = ConfigFile::parse("colour = \"blue\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, AcquireError::Config { .. }));

        let err = ConfigFile::parse("format = \"fl/ac\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, AcquireError::Config { .. }));
    }
}
