use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::asset::{AssetKind, DownloadOutcome};

/// Counters for one loop (images or tracks) of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCounts {
    /// Candidates considered (after exclusion filtering).
    pub candidates: usize,
    /// Candidates for which no downloadable asset could be found.
    pub unresolved: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl AssetCounts {
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Skipped => self.skipped += 1,
            DownloadOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Assets present on disk after the run, whether fetched now or earlier.
    pub fn present(&self) -> usize {
        self.downloaded + self.skipped
    }
}

/// What a completed run did, reported to the user and the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub album_url: String,
    /// RFC 3339 time the run started.
    pub fetched_at: String,
    pub title: String,
    pub output_dir: PathBuf,
    pub images: AssetCounts,
    pub tracks: AssetCounts,
}

impl RunSummary {
    pub fn new(album_url: String, title: String, output_dir: PathBuf) -> Self {
        Self {
            album_url,
            fetched_at: chrono::Utc::now().to_rfc3339(),
            title,
            output_dir,
            images: AssetCounts::default(),
            tracks: AssetCounts::default(),
        }
    }

    pub fn counts_mut(&mut self, kind: AssetKind) -> &mut AssetCounts {
        match kind {
            AssetKind::Image => &mut self.images,
            AssetKind::Track => &mut self.tracks,
        }
    }

    /// True when every candidate ended up on disk.
    pub fn is_complete(&self) -> bool {
        self.images.failed == 0
            && self.images.unresolved == 0
            && self.tracks.failed == 0
            && self.tracks.unresolved == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: images {}/{} ({} new, {} failed, {} unresolved), tracks {}/{} ({} new, {} failed, {} unresolved)",
            self.title,
            self.images.present(),
            self.images.candidates,
            self.images.downloaded,
            self.images.failed,
            self.images.unresolved,
            self.tracks.present(),
            self.tracks.candidates,
            self.tracks.downloaded,
            self.tracks.failed,
            self.tracks.unresolved,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut summary = RunSummary::new("u".into(), "Foo".into(), PathBuf::from("Foo"));
        summary.tracks.candidates = 3;
        summary
            .counts_mut(AssetKind::Track)
            .record(&DownloadOutcome::Downloaded { bytes: 10 });
        summary
            .counts_mut(AssetKind::Track)
            .record(&DownloadOutcome::Skipped);
        summary.counts_mut(AssetKind::Track).record(&DownloadOutcome::Failed {
            reason: "HTTP 404".into(),
        });

        assert_eq!(summary.tracks.present(), 2);
        assert_eq!(summary.tracks.bytes, 10);
        assert_eq!(summary.tracks.failed, 1);
        assert!(!summary.is_complete());
        assert_eq!(
            summary.to_string(),
            "Foo: images 0/0 (0 new, 0 failed, 0 unresolved), tracks 2/3 (1 new, 1 failed, 0 unresolved)"
        );
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = RunSummary::new("u".into(), "Foo".into(), PathBuf::from("Foo"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["title"], "Foo");
        assert_eq!(json["tracks"]["downloaded"], 0);
        assert!(json["fetched_at"].as_str().unwrap().contains('T'));
    }
}
