pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod notify;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod retry;

#[cfg(test)]
mod testing;

pub use config::{ConfigFile, ErrorPolicy, PipelineConfig};
pub use error::{AcquireError, Result};
pub use http::{BodyStream, Fetcher, HttpClient, Transport};
pub use notify::{LogNotifier, NoProgress, NoopNotifier, Notifier, Progress};
pub use pipeline::AlbumPipeline;
pub use retry::RetryPolicy;
