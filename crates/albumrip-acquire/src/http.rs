use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use url::Url;

use crate::error::{AcquireError, Result};
use crate::retry::{run_with_retry, RetryPolicy};

/// Browser-like identification; some catalog hosts refuse unknown agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// A response body read incrementally.
#[async_trait]
pub trait BodyStream: Send {
    /// Next chunk of the body, or `None` once it is complete.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// The network side of the pipeline: plain GETs with an optional referer.
///
/// Implementations must fail with [`AcquireError::Http`] on a non-success
/// status and must bound every call with a timeout.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_page(&self, url: &Url, referer: Option<&Url>) -> Result<String>;

    async fn get_asset(&self, url: &Url, referer: &Url) -> Result<Box<dyn BodyStream>>;
}

/// reqwest-backed [`Transport`] sharing one connection pool across requests.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    page_timeout: Duration,
    download_timeout: Duration,
}

impl HttpClient {
    /// `page_timeout` bounds a whole page fetch. `download_timeout` bounds
    /// the wait for response headers and for each body chunk of an asset,
    /// so large files are not cut off while data keeps flowing.
    pub fn new(user_agent: &str, page_timeout: Duration, download_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(page_timeout)
            .build()
            .map_err(AcquireError::Client)?;

        Ok(Self {
            client,
            page_timeout,
            download_timeout,
        })
    }

    fn get(&self, url: &Url, referer: Option<&Url>) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url.clone());
        if let Some(referer) = referer {
            request = request.header(reqwest::header::REFERER, referer.as_str());
        }
        request
    }
}

fn check_status(response: &reqwest::Response, url: &Url) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(AcquireError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get_page(&self, url: &Url, referer: Option<&Url>) -> Result<String> {
        let response = self
            .get(url, referer)
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(|e| AcquireError::request(url.as_str(), e))?;

        check_status(&response, url)?;

        response
            .text()
            .await
            .map_err(|e| AcquireError::request(url.as_str(), e))
    }

    async fn get_asset(&self, url: &Url, referer: &Url) -> Result<Box<dyn BodyStream>> {
        let send = self.get(url, Some(referer)).send();
        let response = match tokio::time::timeout(self.download_timeout, send).await {
            Ok(result) => result.map_err(|e| AcquireError::request(url.as_str(), e))?,
            Err(_) => {
                return Err(AcquireError::Timeout {
                    url: url.to_string(),
                })
            }
        };

        check_status(&response, url)?;

        Ok(Box::new(ResponseBody {
            url: url.to_string(),
            response,
            idle_timeout: self.download_timeout,
        }))
    }
}

struct ResponseBody {
    url: String,
    response: reqwest::Response,
    idle_timeout: Duration,
}

#[async_trait]
impl BodyStream for ResponseBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match tokio::time::timeout(self.idle_timeout, self.response.chunk()).await {
            Ok(Ok(chunk)) => Ok(chunk),
            Ok(Err(e)) => Err(AcquireError::request(&self.url, e)),
            Err(_) => Err(AcquireError::Timeout {
                url: self.url.clone(),
            }),
        }
    }
}

/// A [`Transport`] with retry applied to every request.
pub struct Fetcher<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch an HTML page, presenting `referer` if given.
    pub async fn fetch_page(&self, url: &Url, referer: Option<&Url>) -> Result<String> {
        tracing::debug!(url = %url, "Fetching page");
        let html = run_with_retry(&self.retry, url.as_str(), || {
            self.transport.get_page(url, referer)
        })
        .await?;
        tracing::debug!(url = %url, bytes = html.len(), "Received HTML");
        Ok(html)
    }

    /// Open a streaming GET for an asset. Only opening is retried; a stream
    /// that breaks part-way surfaces its error to the caller.
    pub async fn open_asset(&self, url: &Url, referer: &Url) -> Result<Box<dyn BodyStream>> {
        run_with_retry(&self.retry, url.as_str(), || {
            self.transport.get_asset(url, referer)
        })
        .await
    }
}
