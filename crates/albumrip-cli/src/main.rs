mod progress;

use albumrip_acquire::{AlbumPipeline, ConfigFile, ErrorPolicy, LogNotifier, PipelineConfig};
use albumrip_model::TargetFormat;
use anyhow::{Context, Result};
use clap::Parser;
use progress::BarProgress;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Parser)]
#[command(name = "albumrip")]
#[command(about = "Download an album's artwork and lossless tracks from its catalog page")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Album page URL (prompted for when omitted)
    #[arg(short, long)]
    url: Option<String>,

    /// Album directory name (default: the album title)
    #[arg(short, long)]
    out: Option<String>,

    /// Directory in which the album directory is created
    #[arg(short = 'd', long)]
    base_dir: Option<PathBuf>,

    /// Audio format column to download, e.g. "flac" or "mp3"
    #[arg(short, long)]
    format: Option<TargetFormat>,

    /// What to do when a track cannot be resolved or downloaded
    #[arg(long, value_enum)]
    on_error: Option<OnError>,

    /// Pause between tracks, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Page fetch timeout, in seconds
    #[arg(long)]
    page_timeout: Option<u64>,

    /// Asset download timeout (headers and each body chunk), in seconds
    #[arg(long)]
    download_timeout: Option<u64>,

    /// Attempts per request, including the first
    #[arg(long)]
    retries: Option<u32>,

    /// Skip image links containing this text (repeatable; replaces the default)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    /// Save the album page as album.html next to the downloads
    #[arg(long)]
    save_html: bool,

    /// TOML settings file; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Do not draw progress bars
    #[arg(long)]
    no_progress: bool,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long)]
    utc: bool,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OnError {
    /// Log the failed track and carry on
    Continue,
    /// Stop at the first failed track
    Abort,
}

impl From<OnError> for ErrorPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Continue => ErrorPolicy::Continue,
            OnError::Abort => ErrorPolicy::Abort,
        }
    }
}

fn init_tracing(cli: &Cli) {
    // Map log level, suppressing noisy HTML-parsing crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }
}

/// Defaults, then the settings file, then command-line flags.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();

    if let Some(path) = &cli.config {
        ConfigFile::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?
            .apply(&mut config);
    }

    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    config.output_override = cli.out.clone();
    if let Some(format) = &cli.format {
        config.format = format.clone();
    }
    if let Some(on_error) = cli.on_error {
        config.error_policy = on_error.into();
    }
    if let Some(ms) = cli.delay_ms {
        config.track_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = cli.page_timeout {
        config.page_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.download_timeout {
        config.download_timeout = Duration::from_secs(secs);
    }
    if let Some(attempts) = cli.retries {
        config.retry.max_attempts = attempts.max(1);
    }
    if !cli.exclude.is_empty() {
        config.exclude_patterns = cli.exclude.clone();
    }
    if cli.save_html {
        config.save_html = true;
    }

    Ok(config)
}

/// Exit status after a forced quit, as for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// The first interrupt raises `abort` so the pipeline stops before its next
/// item. Returns true if a second interrupt arrives after that.
async fn watch_interrupts<F, Fut>(abort: Arc<AtomicBool>, mut interrupted: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupted().await.is_err() {
        return false;
    }
    tracing::warn!("Interrupted, stopping before the next item (Ctrl-C again to quit now)");
    abort.store(true, Ordering::Relaxed);

    interrupted().await.is_ok()
}

fn prompt_for_url() -> Result<String> {
    let mut stderr = std::io::stderr();
    write!(stderr, "Album URL: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read album URL from stdin")?;

    let url = line.trim().to_string();
    anyhow::ensure!(!url.is_empty(), "No album URL given");
    Ok(url)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = build_config(&cli)?;

    let raw_url = match &cli.url {
        Some(url) => url.trim().to_string(),
        None => prompt_for_url()?,
    };
    let album_url = Url::parse(&raw_url).with_context(|| format!("Invalid album URL: {raw_url}"))?;

    tracing::info!(
        url = %album_url,
        base_dir = %config.base_dir.display(),
        format = %config.format,
        on_error = ?config.error_policy,
        "Starting album download"
    );

    let client = config.http_client()?;
    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = Arc::clone(&abort);
        tokio::spawn(async move {
            if watch_interrupts(abort, tokio::signal::ctrl_c).await {
                tracing::warn!("Interrupted again, quitting");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        });
    }

    let pipeline = AlbumPipeline::new(config, client)
        .with_notifier(LogNotifier)
        .with_progress(BarProgress::new(!cli.no_progress))
        .with_abort_flag(abort);

    let summary = pipeline
        .run(&album_url)
        .await
        .with_context(|| format!("Failed to download album {album_url}"))?;

    if !summary.is_complete() {
        tracing::warn!("Some assets are missing; run again to retry them");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
        println!("Saved to {}", summary.output_dir.display());
    }

    Ok(())
}
