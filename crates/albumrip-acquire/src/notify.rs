use albumrip_model::AssetKind;

/// Receives the end-of-run message, e.g. to raise a desktop notification.
pub trait Notifier: Send + Sync {
    fn notify_success(&self, title: &str, message: &str);

    fn notify_failure(&self, title: &str, message: &str);
}

/// Reports through the log. Used when no platform notifier is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_success(&self, title: &str, message: &str) {
        tracing::info!(title = %title, "{message}");
    }

    fn notify_failure(&self, title: &str, message: &str) {
        tracing::error!(title = %title, "{message}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify_success(&self, _title: &str, _message: &str) {}

    fn notify_failure(&self, _title: &str, _message: &str) {}
}

/// Per-item progress through the image and track loops.
///
/// Each loop calls `begin` once with its candidate count, `advance` after
/// every item whatever its outcome, and `finish` when the loop ends, aborted
/// runs included.
pub trait Progress: Send + Sync {
    fn begin(&self, kind: AssetKind, total: usize);

    fn advance(&self, kind: AssetKind);

    fn finish(&self, kind: AssetKind);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&self, _kind: AssetKind, _total: usize) {}

    fn advance(&self, _kind: AssetKind) {}

    fn finish(&self, _kind: AssetKind) {}
}
