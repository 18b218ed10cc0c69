//! Reporter trait for dependency injection
//!
//! This trait allows pipeline stages to report progress and status without
//! being coupled to a specific console implementation.

/// Sink for progress and status messages emitted by the pipeline.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Packaging 7.2.0").
    fn section(&self, title: &str);

    /// Updates the progress of an archive download.
    fn downloading(&self, platform: &str, current: u64, total: Option<u64>);

    /// Marks a platform or artifact as successfully completed.
    fn done(&self, item: &str, detail: &str);

    /// Marks a platform or artifact as failed with a specific reason.
    fn failed(&self, item: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, platform: &str, current: u64, total: Option<u64>) {
        (**self).downloading(platform, current, total);
    }
    fn done(&self, item: &str, detail: &str) {
        (**self).done(item, detail);
    }
    fn failed(&self, item: &str, reason: &str) {
        (**self).failed(item, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn done(&self, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
