use albumrip_acquire::Progress;
use albumrip_model::AssetKind;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str = "{prefix:>6} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}";

/// Terminal progress bars for the image and track loops, drawn on stderr.
pub struct BarProgress {
    images: ProgressBar,
    tracks: ProgressBar,
    visible: bool,
}

impl BarProgress {
    /// Bars stay hidden until their loop begins, and for good when `visible`
    /// is false.
    pub fn new(visible: bool) -> Self {
        Self {
            images: make_bar("images"),
            tracks: make_bar("tracks"),
            visible,
        }
    }

    fn bar(&self, kind: AssetKind) -> &ProgressBar {
        match kind {
            AssetKind::Image => &self.images,
            AssetKind::Track => &self.tracks,
        }
    }
}

fn make_bar(prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::hidden();
    bar.set_style(
        ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_prefix(prefix);
    bar
}

impl Progress for BarProgress {
    fn begin(&self, kind: AssetKind, total: usize) {
        let bar = self.bar(kind);
        bar.set_length(total as u64);
        bar.set_position(0);
        if self.visible {
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        }
    }

    fn advance(&self, kind: AssetKind) {
        self.bar(kind).inc(1);
    }

    fn finish(&self, kind: AssetKind) {
        self.bar(kind).finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_track_each_loop() {
        let progress = BarProgress::new(false);

        progress.begin(AssetKind::Image, 2);
        progress.advance(AssetKind::Image);
        progress.begin(AssetKind::Track, 5);
        progress.advance(AssetKind::Track);
        progress.advance(AssetKind::Track);
        progress.finish(AssetKind::Track);

        assert_eq!(progress.images.length(), Some(2));
        assert_eq!(progress.images.position(), 1);
        assert_eq!(progress.tracks.length(), Some(5));
        assert_eq!(progress.tracks.position(), 2);
        assert!(progress.tracks.is_finished());
        assert!(!progress.images.is_finished());
    }
}
