//! Backend adapters: one per external HTML-to-PDF engine.
//!
//! ```text
//! ConversionJob ──┬─ headless-chrome  DevTools-driven Chrome (blocking driver)
//!                 ├─ chromium         async CDP client, Page.printToPDF
//!                 ├─ weasyprint       `weasyprint` executable + print stylesheet
//!                 └─ wkhtmltopdf      `wkhtmltopdf` executable + fixed flag set
//! ```
//!
//! Every adapter implements [`Backend`]. Adapters share nothing but the
//! job they are handed: each one probes its own dependency, launches and
//! tears down its own process, and reduces every failure to a
//! [`BackendError`]. None of them retries.

pub mod chrome;
pub mod chromium;
mod process;
pub mod weasyprint;
pub mod wkhtmltopdf;

pub use chrome::HeadlessChromeBackend;
pub use chromium::ChromiumBackend;
pub use weasyprint::WeasyPrintBackend;
pub use wkhtmltopdf::WkhtmltopdfBackend;

use crate::config::BackendOptions;
use crate::error::{BackendError, Html2PdfError};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

// ── Kinds ────────────────────────────────────────────────────────────────

/// The fixed set of backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Chrome launched and driven over the DevTools protocol.
    #[serde(rename = "headless-chrome")]
    HeadlessChrome,
    /// Chromium through an async CDP client.
    #[serde(rename = "chromium")]
    Chromium,
    /// The WeasyPrint CSS layout engine.
    #[serde(rename = "weasyprint")]
    WeasyPrint,
    /// The wkhtmltopdf renderer.
    #[serde(rename = "wkhtmltopdf")]
    Wkhtmltopdf,
}

/// Auto-mode priority: the engines most likely to be installed come first.
pub const DEFAULT_PRIORITY: [BackendKind; 4] = [
    BackendKind::HeadlessChrome,
    BackendKind::Chromium,
    BackendKind::WeasyPrint,
    BackendKind::Wkhtmltopdf,
];

impl BackendKind {
    /// All kinds, in default priority order.
    pub const ALL: [BackendKind; 4] = DEFAULT_PRIORITY;

    /// Canonical CLI name.
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::HeadlessChrome => "headless-chrome",
            BackendKind::Chromium => "chromium",
            BackendKind::WeasyPrint => "weasyprint",
            BackendKind::Wkhtmltopdf => "wkhtmltopdf",
        }
    }

    /// Alternative names accepted on the command line, including the names
    /// of the tools each backend replaces.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            BackendKind::HeadlessChrome => &["chrome", "selenium"],
            BackendKind::Chromium => &["playwright"],
            BackendKind::WeasyPrint => &[],
            BackendKind::Wkhtmltopdf => &["wkhtml", "pdfkit"],
        }
    }

    fn matches(self, name: &str) -> bool {
        self.name() == name || self.aliases().contains(&name)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = Html2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        BackendKind::ALL
            .into_iter()
            .find(|k| k.matches(&wanted))
            .ok_or_else(|| Html2PdfError::UnknownBackend {
                name: s.to_string(),
                expected: BackendKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

// ── Job & trait ──────────────────────────────────────────────────────────

/// Everything an adapter needs for one attempt.
///
/// Built once per conversion and shared, unchanged, by every attempted
/// backend.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Absolute path of the input HTML document.
    pub input: PathBuf,
    /// Absolute path the PDF must be written to.
    pub output: PathBuf,
    /// Effective options (defaults merged with the request's overrides).
    pub options: BackendOptions,
}

impl ConversionJob {
    /// The input as a `file://` URL, for the browser backends.
    pub fn input_url(&self, backend: BackendKind) -> Result<String, BackendError> {
        url::Url::from_file_path(&self.input)
            .map(|u| u.to_string())
            .map_err(|_| {
                BackendError::failed(
                    backend,
                    format!("cannot build a file URL from '{}'", self.input.display()),
                )
            })
    }
}

/// A named, stateless HTML-to-PDF capability.
///
/// `attempt` either writes `job.output` and returns `Ok(())`, or returns a
/// [`BackendError`] describing why it could not. Implementations must
/// release any process they start before returning, on every path.
pub trait Backend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Check that the backend's dependency is present, without converting.
    fn check(&self, options: &BackendOptions) -> Result<(), BackendError> {
        let _ = options;
        Ok(())
    }

    /// Convert `job.input` into `job.output`.
    fn attempt<'a>(&'a self, job: &'a ConversionJob) -> BoxFuture<'a, Result<(), BackendError>>;
}

/// The four built-in backends in [`DEFAULT_PRIORITY`] order.
pub fn default_backends() -> Vec<Arc<dyn Backend>> {
    vec![
        Arc::new(HeadlessChromeBackend),
        Arc::new(ChromiumBackend),
        Arc::new(WeasyPrintBackend),
        Arc::new(WkhtmltopdfBackend),
    ]
}

// ── Shared helpers ───────────────────────────────────────────────────────

/// Map an `engine-probe` failure to a missing-dependency error.
pub(crate) fn engine_missing(
    backend: BackendKind,
    engine: &engine_probe::Engine,
    err: engine_probe::ProbeError,
) -> BackendError {
    let hint = match err {
        engine_probe::ProbeError::NotFound { hint, .. } => hint,
        other => other.to_string(),
    };
    BackendError::DependencyMissing {
        backend,
        dependency: engine.name.to_string(),
        hint,
    }
}

/// The error reported by a backend whose cargo feature was disabled at build
/// time.
#[cfg(any(not(feature = "chrome"), not(feature = "chromium")))]
pub(crate) fn feature_missing(backend: BackendKind, feature: &str, driver: &str) -> BackendError {
    BackendError::DependencyMissing {
        backend,
        dependency: format!("the `{driver}` driver"),
        hint: format!(
            "This build was compiled without it. Rebuild with: \
             cargo install edgequake-html2pdf --features {feature}"
        ),
    }
}

/// Write PDF bytes produced in memory to `path`.
///
/// Atomic write: write to a sibling temp file, then rename, so a failed
/// attempt never leaves a truncated PDF behind for the next backend.
pub(crate) async fn write_pdf_atomic(
    backend: BackendKind,
    path: &Path,
    bytes: &[u8],
) -> Result<(), BackendError> {
    let write_err = |e: std::io::Error| BackendError::OutputWriteFailed {
        backend,
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    if bytes.is_empty() {
        return Err(BackendError::failed(backend, "engine returned an empty PDF"));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// A sibling temp file an executable engine writes into, renamed over the
/// real output only once it has been verified.
///
/// Dropping it without [`commit`](Self::commit) removes the temp file, so a
/// failed run leaves neither a partial PDF nor a touched `target`.
pub(crate) struct StagedOutput {
    backend: BackendKind,
    tmp: tempfile::TempPath,
    target: PathBuf,
}

impl StagedOutput {
    pub(crate) async fn new(backend: BackendKind, target: &Path) -> Result<Self, BackendError> {
        let write_err = |e: std::io::Error| BackendError::OutputWriteFailed {
            backend,
            path: target.to_path_buf(),
            detail: e.to_string(),
        };

        let parent = match target.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };

        let tmp = tempfile::Builder::new()
            .prefix(".html2pdf-")
            .suffix(".pdf")
            .tempfile_in(&parent)
            .map_err(write_err)?
            .into_temp_path();

        Ok(Self {
            backend,
            tmp,
            target: target.to_path_buf(),
        })
    }

    /// Where the engine should write.
    pub(crate) fn path(&self) -> &Path {
        &self.tmp
    }

    /// Verify what the engine wrote and move it to the real output path.
    pub(crate) async fn commit(self) -> Result<(), BackendError> {
        verify_output(self.backend, &self.tmp).await?;

        // tempfile creates 0600.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = tokio::fs::set_permissions(&self.tmp, std::fs::Permissions::from_mode(0o644))
                .await;
        }

        let Self {
            backend,
            tmp,
            target,
        } = self;
        tmp.persist(&target)
            .map_err(|e| BackendError::OutputWriteFailed {
                backend,
                path: target.clone(),
                detail: e.error.to_string(),
            })?;
        debug!("Moved engine output to {}", target.display());
        Ok(())
    }
}

/// Confirm that an engine which reported success left a non-empty file at
/// `path`.
pub(crate) async fn verify_output(backend: BackendKind, path: &Path) -> Result<(), BackendError> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() && m.len() > 0 => Ok(()),
        Ok(_) => Err(BackendError::failed(
            backend,
            "engine exited successfully but wrote no PDF",
        )),
        Err(_) => Err(BackendError::failed(
            backend,
            format!("engine exited successfully but did not create '{}'", path.display()),
        )),
    }
}
