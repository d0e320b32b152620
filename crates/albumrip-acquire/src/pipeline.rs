use albumrip_model::{Album, AssetKind, DownloadOutcome, ImageLink, RunSummary, TrackEntry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

use crate::config::{ErrorPolicy, PipelineConfig};
use crate::download::download;
use crate::error::{AcquireError, Result};
use crate::http::{Fetcher, Transport};
use crate::notify::{LogNotifier, NoProgress, Notifier, Progress};
use crate::output;
use crate::resolve::{parse_album_page, resolve_image, resolve_track};

/// Downloads one album: artwork first, then every track of the target format.
///
/// The run is strictly sequential. An abort flag is checked before each
/// image and track, and again after the pause between tracks; a request
/// already in flight is allowed to finish.
pub struct AlbumPipeline<T> {
    config: PipelineConfig,
    fetcher: Fetcher<T>,
    notifier: Box<dyn Notifier>,
    progress: Box<dyn Progress>,
    abort: Arc<AtomicBool>,
}

impl<T: Transport> AlbumPipeline<T> {
    pub fn new(config: PipelineConfig, transport: T) -> Self {
        let fetcher = Fetcher::new(transport, config.retry);
        Self {
            config,
            fetcher,
            notifier: Box::new(LogNotifier),
            progress: Box::new(NoProgress),
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_progress(mut self, progress: impl Progress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Share an externally owned abort flag, e.g. one set from a Ctrl-C handler.
    pub fn with_abort_flag(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    /// Run the whole album and report the result to the notifier.
    pub async fn run(&self, album_url: &Url) -> Result<RunSummary> {
        match self.run_album(album_url).await {
            Ok(summary) => {
                self.notifier
                    .notify_success("Album download complete", &summary.to_string());
                Ok(summary)
            }
            Err(e) => {
                self.notifier
                    .notify_failure("Album download failed", &format!("{album_url}: {e}"));
                Err(e)
            }
        }
    }

    async fn run_album(&self, album_url: &Url) -> Result<RunSummary> {
        tracing::info!(url = %album_url, "Fetching album page");
        let html = self.fetcher.fetch_page(album_url, None).await?;

        let page = parse_album_page(
            &html,
            album_url,
            &self.config.format,
            &self.config.exclude_patterns,
        );
        let album = Album::new(
            album_url.clone(),
            &page.title,
            &self.config.base_dir,
            self.config.output_override.as_deref(),
        );
        tracing::info!(title = %album.title, path = %album.output_dir.display(), "Album");

        output::prepare_dirs(&album)?;
        if self.config.save_html {
            output::cache_html(&album, &html)?;
        }

        let mut summary = RunSummary::new(
            album_url.to_string(),
            album.title.clone(),
            album.output_dir.clone(),
        );

        self.download_images(&album, &page.images, &mut summary).await?;

        let tracks = page.tracks.ok_or_else(|| AcquireError::TrackTableMissing {
            url: album_url.to_string(),
            format: self.config.format.label.clone(),
        })?;
        self.download_tracks(&album, &tracks, &mut summary).await?;

        tracing::info!(
            images = summary.images.present(),
            tracks = summary.tracks.present(),
            bytes = summary.images.bytes + summary.tracks.bytes,
            "Album done"
        );
        Ok(summary)
    }

    fn check_abort(&self) -> Result<()> {
        if self.abort.load(Ordering::Relaxed) {
            return Err(AcquireError::Aborted);
        }
        Ok(())
    }

    /// Best effort: no image failure stops the run.
    async fn download_images(
        &self,
        album: &Album,
        links: &[ImageLink],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let candidates: Vec<&ImageLink> = links.iter().filter(|l| !l.excluded).collect();
        tracing::info!(
            candidates = candidates.len(),
            excluded = links.len() - candidates.len(),
            "Collecting images"
        );
        summary.images.candidates = candidates.len();

        self.progress.begin(AssetKind::Image, candidates.len());
        let result = self.image_loop(album, &candidates, summary).await;
        self.progress.finish(AssetKind::Image);
        result
    }

    async fn image_loop(
        &self,
        album: &Album,
        candidates: &[&ImageLink],
        summary: &mut RunSummary,
    ) -> Result<()> {
        for link in candidates {
            self.check_abort()?;
            self.download_image(album, link, summary).await;
            self.progress.advance(AssetKind::Image);
        }
        Ok(())
    }

    async fn download_image(&self, album: &Album, link: &ImageLink, summary: &mut RunSummary) {
        let asset = match resolve_image(&self.fetcher, album, link).await {
            Ok(Some(asset)) => asset,
            Ok(None) => {
                tracing::warn!(page = %link.target, "No full-size image found, skipping");
                summary.images.unresolved += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(page = %link.target, error = %e, "Could not resolve image, skipping");
                summary.images.unresolved += 1;
                return;
            }
        };

        let outcome = match download(&self.fetcher, &asset).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(url = %asset.url, error = %e, "Image download failed");
                DownloadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        summary.counts_mut(AssetKind::Image).record(&outcome);
    }

    async fn download_tracks(
        &self,
        album: &Album,
        tracks: &[TrackEntry],
        summary: &mut RunSummary,
    ) -> Result<()> {
        tracing::info!(tracks = tracks.len(), format = %self.config.format, "Downloading tracks");
        summary.tracks.candidates = tracks.len();

        self.progress.begin(AssetKind::Track, tracks.len());
        let result = self.track_loop(album, tracks, summary).await;
        self.progress.finish(AssetKind::Track);
        result
    }

    async fn track_loop(
        &self,
        album: &Album,
        tracks: &[TrackEntry],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let total = tracks.len();

        for (i, entry) in tracks.iter().enumerate() {
            self.check_abort()?;
            if i > 0 && !self.config.track_delay.is_zero() {
                tokio::time::sleep(self.config.track_delay).await;
                self.check_abort()?;
            }

            let result = self.download_track(album, entry, total, summary).await;
            self.progress.advance(AssetKind::Track);
            if let Err(e) = result {
                self.track_failed(entry, total, e)?;
            }
        }

        Ok(())
    }

    /// Resolve and fetch one track, counting any failure in `summary`.
    async fn download_track(
        &self,
        album: &Album,
        entry: &TrackEntry,
        total: usize,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let asset = match resolve_track(&self.fetcher, album, &self.config.format, entry).await {
            Ok(asset) => asset,
            Err(e) => {
                summary.tracks.unresolved += 1;
                return Err(e);
            }
        };

        tracing::info!(
            track = entry.position,
            total,
            file = %asset.destination.display(),
            "Track"
        );
        match download(&self.fetcher, &asset).await {
            Ok(outcome) => {
                summary.counts_mut(AssetKind::Track).record(&outcome);
                Ok(())
            }
            Err(e) => {
                summary
                    .counts_mut(AssetKind::Track)
                    .record(&DownloadOutcome::Failed {
                        reason: e.to_string(),
                    });
                Err(e)
            }
        }
    }

    fn track_failed(&self, entry: &TrackEntry, total: usize, err: AcquireError) -> Result<()> {
        match self.config.error_policy {
            ErrorPolicy::Continue => {
                tracing::warn!(
                    track = entry.position,
                    total,
                    link = %entry.link,
                    error = %err,
                    "Skipping track"
                );
                Ok(())
            }
            ErrorPolicy::Abort => {
                tracing::error!(track = entry.position, total, link = %entry.link, "Track failed, aborting run");
                Err(err)
            }
        }
    }
}
