//! Output types returned by a successful conversion.

use crate::backends::BackendKind;
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened during one conversion.
///
/// Returned by [`crate::convert::Converter::convert`] on success and printed
/// as JSON by `html2pdf --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Absolute path of the input HTML document.
    pub input: PathBuf,
    /// Absolute path of the PDF that was written.
    pub output: PathBuf,
    /// The backend that produced the PDF.
    pub backend: BackendKind,
    /// Every attempt in the order it was made. The last one succeeded.
    pub attempts: Vec<AttemptRecord>,
    pub total_duration_ms: u64,
}

impl ConversionReport {
    /// Attempts that failed before the successful one.
    pub fn failed_attempts(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.attempts.iter().filter(|a| a.error.is_some())
    }
}

/// One backend invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub backend: BackendKind,
    /// `None` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BackendError>,
    pub duration_ms: u64,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ConversionReport {
        ConversionReport {
            input: PathBuf::from("/tmp/poster.html"),
            output: PathBuf::from("/tmp/poster.pdf"),
            backend: BackendKind::WeasyPrint,
            attempts: vec![
                AttemptRecord {
                    backend: BackendKind::HeadlessChrome,
                    error: Some(BackendError::DependencyMissing {
                        backend: BackendKind::HeadlessChrome,
                        dependency: "Chrome".into(),
                        hint: "install Chrome".into(),
                    }),
                    duration_ms: 3,
                },
                AttemptRecord {
                    backend: BackendKind::WeasyPrint,
                    error: None,
                    duration_ms: 812,
                },
            ],
            total_duration_ms: 815,
        }
    }

    #[test]
    fn failed_attempts_excludes_the_winner() {
        let r = report();
        let failed: Vec<BackendKind> = r.failed_attempts().map(|a| a.backend).collect();
        assert_eq!(failed, vec![BackendKind::HeadlessChrome]);
        assert!(r.attempts[1].succeeded());
    }

    #[test]
    fn json_uses_cli_names_and_omits_empty_errors() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["backend"], "weasyprint");
        assert_eq!(json["attempts"][0]["backend"], "headless-chrome");
        assert!(json["attempts"][0]["error"].is_object());
        assert!(json["attempts"][1].get("error").is_none());
    }
}
