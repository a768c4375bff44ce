//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline walks its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a Tokio channel, a WebSocket, or a terminal
//! spinner without the library knowing anything about how the host
//! application communicates. The status strings delivered here are purely
//! presentational — the state machine itself carries no display text, so
//! dropping every event changes nothing about the run.
//!
//! # Example
//!
//! ```rust
//! use cvlens::{AnalysisProgressCallback, Stage};
//!
//! struct PrintingCallback;
//!
//! impl AnalysisProgressCallback for PrintingCallback {
//!     fn on_stage_start(&self, _stage: Stage, status: &str) {
//!         eprintln!("{status}");
//!     }
//! }
//! ```

use crate::pipeline::stage::Stage;
use std::sync::Arc;

/// Called by the pipeline as each stage begins, fails, or the run ends.
///
/// Implementations must be `Send + Sync`. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// A stage was entered. `status` is the stage's display label.
    fn on_stage_start(&self, stage: Stage, status: &str) {
        let _ = (stage, status);
    }

    /// The run terminated in `stage`. `error` is the human-readable cause;
    /// callers are expected to display it and halt further progress
    /// indication.
    fn on_stage_failed(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// The run completed; the record under `record_id` now carries
    /// feedback.
    fn on_completed(&self, record_id: &str) {
        let _ = record_id;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        failures: AtomicUsize,
        completions: AtomicUsize,
        last_status: Mutex<String>,
    }

    impl AnalysisProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: Stage, status: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
            *self.last_status.lock().unwrap() = status.to_string();
        }

        fn on_stage_failed(&self, _stage: Stage, _error: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_completed(&self, _record_id: &str) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::UploadingOriginal, "Uploading resume…");
        cb.on_stage_failed(Stage::Invoking, "AI feedback failed");
        cb.on_completed("some-id");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback::default();
        cb.on_stage_start(Stage::UploadingOriginal, Stage::UploadingOriginal.status_label());
        cb.on_stage_start(Stage::Rasterizing, Stage::Rasterizing.status_label());
        cb.on_stage_failed(Stage::Rasterizing, "boom");

        assert_eq!(cb.starts.load(Ordering::SeqCst), 2);
        assert_eq!(cb.failures.load(Ordering::SeqCst), 1);
        assert_eq!(cb.completions.load(Ordering::SeqCst), 0);
        assert_eq!(*cb.last_status.lock().unwrap(), "Converting PDF to image…");
    }

    #[test]
    fn arc_dyn_callback_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProgressCallback>();

        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Completed, Stage::Completed.status_label());
    }
}
