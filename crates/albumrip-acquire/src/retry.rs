//! Bounded retry with exponential backoff for page fetches and asset requests.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::error::{AcquireError, Result};

/// Retry-relevant classification of an [`AcquireError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request timed out (connect or read).
    Timeout,
    /// Server asked us to slow down (408, 429).
    Throttled,
    /// Network-level failure (connection reset, DNS, truncated body).
    Connection,
    /// 5xx status.
    Server(u16),
    /// Anything else; never retried.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// `attempt` is 1-based.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts.max(1) {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Throttled
            | ErrorKind::Connection
            | ErrorKind::Server(_) => {
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                let delay = self.base_delay.saturating_mul(exp).min(self.max_delay);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

pub fn classify(err: &AcquireError) -> ErrorKind {
    match err {
        AcquireError::Http { status, .. } => classify_http_status(*status),
        AcquireError::Request { source, .. } => {
            if source.is_timeout() {
                ErrorKind::Timeout
            } else if source.is_builder() {
                ErrorKind::Other
            } else {
                ErrorKind::Connection
            }
        }
        AcquireError::Timeout { .. } => ErrorKind::Timeout,
        AcquireError::Body { .. } => ErrorKind::Connection,
        _ => ErrorKind::Other,
    }
}

pub fn classify_http_status(status: u16) -> ErrorKind {
    match status {
        408 | 429 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Server(status),
        _ => ErrorKind::Other,
    }
}

/// Run `op` until it succeeds or the policy says stop.
///
/// A non-retryable error is returned as-is. When retries run out the last
/// error is wrapped in [`AcquireError::RetriesExhausted`].
pub async fn run_with_retry<T, F, Fut>(policy: &RetryPolicy, url: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let kind = classify(&err);
                match policy.decide(attempt, kind) {
                    RetryDecision::RetryAfter(delay) => {
                        tracing::warn!(
                            url = %url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::NoRetry if attempt > 1 && kind != ErrorKind::Other => {
                        return Err(AcquireError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    RetryDecision::NoRetry => return Err(err),
                }
            }
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
