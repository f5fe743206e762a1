//! Error types for the edgequake-html2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Html2PdfError`] — **Fatal**: the conversion as a whole failed (input
//!   missing, unknown backend, every backend exhausted). Returned as
//!   `Err(Html2PdfError)` from [`crate::convert::Converter::convert`].
//!
//! * [`BackendError`] — **Per attempt**: one backend could not produce the
//!   PDF (engine not installed, engine crashed). Recorded in
//!   [`crate::output::AttemptRecord`] so auto mode can move on to the next
//!   backend and the final report still shows why each one was skipped.

use crate::backends::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-html2pdf library.
#[derive(Debug, Error)]
pub enum Html2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input HTML file was not found at the given path.
    #[error("HTML file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// The requested method names no known backend.
    #[error("Unknown method '{name}'\nExpected one of: {expected}")]
    UnknownBackend { name: String, expected: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// The explicitly requested backend failed.
    #[error("{0}")]
    BackendFailed(#[source] BackendError),

    /// Auto mode tried every backend and none succeeded.
    #[error("All {} conversion methods failed{}", .attempts.len(), format_attempts(.attempts))]
    AllBackendsFailed { attempts: Vec<BackendError> },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Option overrides failed validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The options file could not be read or parsed.
    #[error("Failed to load options from '{path}': {detail}")]
    OptionsFile { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_attempts(attempts: &[BackendError]) -> String {
    attempts
        .iter()
        .map(|e| format!("\n  • {e}"))
        .collect::<String>()
}

/// A failure of a single backend attempt.
///
/// Every backend reduces whatever went wrong on its side to one of these
/// variants; nothing else escapes an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BackendError {
    /// The engine, or the cargo feature that links its driver, is unavailable.
    #[error("{backend}: {dependency} not available\n    {hint}")]
    DependencyMissing {
        backend: BackendKind,
        dependency: String,
        hint: String,
    },

    /// The engine ran but did not produce a PDF.
    #[error("{backend} conversion failed: {detail}")]
    ConversionFailed { backend: BackendKind, detail: String },

    /// The PDF bytes were produced but could not be written out.
    #[error("{backend}: failed to write '{path}': {detail}")]
    OutputWriteFailed {
        backend: BackendKind,
        path: PathBuf,
        detail: String,
    },
}

impl BackendError {
    /// The backend this error belongs to.
    pub fn backend(&self) -> BackendKind {
        match self {
            BackendError::DependencyMissing { backend, .. }
            | BackendError::ConversionFailed { backend, .. }
            | BackendError::OutputWriteFailed { backend, .. } => *backend,
        }
    }

    /// `true` when the backend never got as far as running its engine.
    pub fn is_dependency_missing(&self) -> bool {
        matches!(self, BackendError::DependencyMissing { .. })
    }

    pub(crate) fn failed(backend: BackendKind, detail: impl Into<String>) -> Self {
        BackendError::ConversionFailed {
            backend,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_not_found_display() {
        let e = Html2PdfError::InputNotFound {
            path: PathBuf::from("poster.html"),
        };
        assert!(e.to_string().contains("poster.html"));
    }

    #[test]
    fn all_failed_lists_every_attempt() {
        let e = Html2PdfError::AllBackendsFailed {
            attempts: vec![
                BackendError::DependencyMissing {
                    backend: BackendKind::WeasyPrint,
                    dependency: "WeasyPrint".into(),
                    hint: "pip install weasyprint".into(),
                },
                BackendError::failed(BackendKind::Wkhtmltopdf, "exit status 1"),
            ],
        };
        let msg = e.to_string();
        assert!(msg.contains("All 2 conversion methods failed"), "got: {msg}");
        assert!(msg.contains("pip install weasyprint"));
        assert!(msg.contains("exit status 1"));
    }

    #[test]
    fn backend_accessor() {
        let e = BackendError::OutputWriteFailed {
            backend: BackendKind::Chromium,
            path: PathBuf::from("/ro/out.pdf"),
            detail: "read-only file system".into(),
        };
        assert_eq!(e.backend(), BackendKind::Chromium);
        assert!(!e.is_dependency_missing());
    }

    #[test]
    fn unknown_backend_display() {
        let e = Html2PdfError::UnknownBackend {
            name: "prince".into(),
            expected: "auto, headless-chrome".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("prince"));
        assert!(msg.contains("headless-chrome"));
    }
}
