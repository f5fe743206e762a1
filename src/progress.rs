//! Progress-callback trait for per-attempt conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::convert::ConverterBuilder::progress_callback`] to hear about each
//! backend attempt as the converter makes it. The CLI uses this to drive its
//! spinner; library callers can forward events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use edgequake_html2pdf::{BackendError, BackendKind, ConversionProgressCallback, Converter};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failures: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for FailureCounter {
//!     fn on_attempt_failure(&self, backend: BackendKind, error: &BackendError, _elapsed_ms: u64) {
//!         self.failures.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{backend} failed: {error}");
//!     }
//! }
//!
//! let converter = Converter::builder()
//!     .progress_callback(Arc::new(FailureCounter { failures: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::backends::BackendKind;
use crate::error::BackendError;
use std::path::Path;
use std::sync::Arc;

/// Called by the converter around each backend attempt.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Attempts are sequential, so events for one
/// conversion never interleave.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after the input and output paths are resolved and
    /// before the first attempt.
    fn on_conversion_start(&self, input: &Path, output: &Path) {
        let _ = (input, output);
    }

    /// Called just before a backend is invoked.
    ///
    /// # Arguments
    /// * `backend` — the backend about to run
    /// * `attempt` — 1-indexed position in this conversion's sequence
    /// * `total`   — number of backends this conversion may try
    fn on_attempt_start(&self, backend: BackendKind, attempt: usize, total: usize) {
        let _ = (backend, attempt, total);
    }

    /// Called when a backend has written the PDF.
    fn on_attempt_success(&self, backend: BackendKind, output: &Path, elapsed_ms: u64) {
        let _ = (backend, output, elapsed_ms);
    }

    /// Called when a backend could not produce the PDF.
    fn on_attempt_failure(&self, backend: BackendKind, error: &BackendError, elapsed_ms: u64) {
        let _ = (backend, error, elapsed_ms);
    }

    /// Called once after the last attempt.
    ///
    /// # Arguments
    /// * `success`  — whether any backend produced the PDF
    /// * `attempts` — how many backends were invoked
    fn on_conversion_complete(&self, success: bool, attempts: usize) {
        let _ = (success, attempts);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::convert::Converter`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
