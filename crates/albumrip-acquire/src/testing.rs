//! In-memory transport for exercising resolution and downloads offline.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

use crate::error::{AcquireError, Result};
use crate::http::{BodyStream, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Page,
    Asset,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    pub url: String,
    pub referer: Option<String>,
}

#[derive(Debug, Clone)]
enum Reply {
    Page(String),
    Asset(Vec<u8>),
    /// Sends the bytes, then fails as if the connection dropped.
    Truncated(Vec<u8>),
    Status(u16),
}

#[derive(Default)]
pub struct MockTransport {
    replies: HashMap<String, Reply>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.replies.insert(url.to_string(), Reply::Page(html.to_string()));
        self
    }

    pub fn asset(mut self, url: &str, body: &[u8]) -> Self {
        self.replies.insert(url.to_string(), Reply::Asset(body.to_vec()));
        self
    }

    pub fn truncated(mut self, url: &str, partial: &[u8]) -> Self {
        self.replies
            .insert(url.to_string(), Reply::Truncated(partial.to_vec()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.replies.insert(url.to_string(), Reply::Status(status));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn page_requests(&self) -> usize {
        self.count(RequestKind::Page)
    }

    pub fn asset_requests(&self) -> usize {
        self.count(RequestKind::Asset)
    }

    fn count(&self, kind: RequestKind) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    fn record(&self, kind: RequestKind, url: &Url, referer: Option<&Url>) -> Option<Reply> {
        self.requests.lock().unwrap().push(RecordedRequest {
            kind,
            url: url.to_string(),
            referer: referer.map(|r| r.to_string()),
        });
        self.replies.get(url.as_str()).cloned()
    }
}

fn not_found(url: &Url) -> AcquireError {
    AcquireError::Http {
        status: 404,
        url: url.to_string(),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_page(&self, url: &Url, referer: Option<&Url>) -> Result<String> {
        match self.record(RequestKind::Page, url, referer) {
            Some(Reply::Page(html)) => Ok(html),
            Some(Reply::Status(status)) => Err(AcquireError::Http {
                status,
                url: url.to_string(),
            }),
            _ => Err(not_found(url)),
        }
    }

    async fn get_asset(&self, url: &Url, referer: &Url) -> Result<Box<dyn BodyStream>> {
        match self.record(RequestKind::Asset, url, Some(referer)) {
            Some(Reply::Asset(body)) => Ok(Box::new(ChunkedBody::new(url, body, false))),
            Some(Reply::Truncated(body)) => Ok(Box::new(ChunkedBody::new(url, body, true))),
            Some(Reply::Status(status)) => Err(AcquireError::Http {
                status,
                url: url.to_string(),
            }),
            _ => Err(not_found(url)),
        }
    }
}

/// Serves a body in small chunks, optionally failing after the last one.
struct ChunkedBody {
    url: String,
    chunks: std::vec::IntoIter<Bytes>,
    fail_at_end: bool,
}

impl ChunkedBody {
    const CHUNK: usize = 5;

    fn new(url: &Url, body: Vec<u8>, fail_at_end: bool) -> Self {
        let chunks: Vec<Bytes> = body
            .chunks(Self::CHUNK)
            .map(Bytes::copy_from_slice)
            .collect();
        Self {
            url: url.to_string(),
            chunks: chunks.into_iter(),
            fail_at_end,
        }
    }
}

#[async_trait]
impl BodyStream for ChunkedBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self.chunks.next() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.fail_at_end => Err(AcquireError::Body {
                url: self.url.clone(),
                message: "connection reset".to_string(),
            }),
            None => Ok(None),
        }
    }
}
