//! Progress-callback trait for per-stage generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use certgen::{GenerationProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let cb: Arc<dyn GenerationProgressCallback> = Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! });
//! cb.on_stage_complete(Stage::Fetch, 12);
//! ```

use crate::error::Stage;
use std::sync::Arc;

/// Called by the generation pipeline as it enters and leaves each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. One request runs its stages sequentially, so events
/// for a single run never interleave.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once, before the template is fetched.
    ///
    /// # Arguments
    /// * `artifact_id`: id naming the scratch files and the published key
    /// * `template_key`: storage key of the template
    fn on_generation_start(&self, artifact_id: &str, template_key: &str) {
        let _ = (artifact_id, template_key);
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called instead of start/complete when a stage does not run. Only QR
    /// embedding is ever skipped, when the request has no QR value; a missing
    /// marker shape still runs the stage and places nothing.
    fn on_stage_skipped(&self, stage: Stage, reason: &str) {
        let _ = (stage, reason);
    }

    /// Called once when a stage fails; the run is over.
    fn on_generation_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the image is published and scratch files are gone.
    ///
    /// # Arguments
    /// * `image_key`: object key of the published JPEG
    /// * `total_duration_ms`: wall-clock time of the whole run
    fn on_generation_complete(&self, image_key: &str, total_duration_ms: u64) {
        let _ = (image_key, total_duration_ms);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        events: Mutex<Vec<String>>,
    }

    impl GenerationProgressCallback for RecordingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }

        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.events.lock().unwrap().push(format!("done {stage}"));
        }

        fn on_stage_skipped(&self, stage: Stage, reason: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("skip {stage}: {reason}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_generation_start("id", "cert_template.pptx");
        cb.on_stage_start(Stage::Fetch);
        cb.on_stage_complete(Stage::Fetch, 3);
        cb.on_stage_skipped(Stage::EmbedQr, "no value for '{{qr_link}}'");
        cb.on_generation_error(Stage::Convert, "exit code 1");
        cb.on_generation_complete("certificates/jpg/id.jpg", 10);
    }

    #[test]
    fn recording_callback_sees_stage_names() {
        let cb = RecordingCallback::default();
        cb.on_stage_start(Stage::Substitute);
        cb.on_stage_complete(Stage::Substitute, 1);
        cb.on_stage_skipped(Stage::EmbedQr, "no value for '{{qr_link}}'");
        let events = cb.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "start substitute",
                "done substitute",
                "skip embed-qr: no value for '{{qr_link}}'"
            ]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Rasterize);
    }
}
