use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AcquireError>;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timed out waiting for {url}")]
    Timeout { url: String },

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("no table with \"Song Name\" and \"{format}\" columns on {url}")]
    TrackTableMissing { url: String, format: String },

    #[error("no {what} link found on {page}")]
    AssetLinkMissing { what: String, page: String },

    #[error("cannot derive a file name from {url}")]
    NoFileName { url: String },

    #[error("{action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("giving up on {url} after {attempts} attempts")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<AcquireError>,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("run aborted by user")]
    Aborted,
}

impl AcquireError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn request(url: &str, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }

    /// HTTP status carried by this error, looking through retry wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }
}
