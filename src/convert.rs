//! The backend selector: picks which backend(s) to run for a request and
//! applies the fallback policy.
//!
//! In `auto` mode the converter walks its priority list and stops at the
//! first backend that writes the PDF. With an explicit method it runs that
//! backend alone. Backends are never run concurrently and never retried.

use crate::backends::{default_backends, Backend, BackendKind, ConversionJob, DEFAULT_PRIORITY};
use crate::config::{BackendOptions, ConversionRequest, AUTO_METHOD};
use crate::error::{BackendError, Html2PdfError};
use crate::output::{AttemptRecord, ConversionReport};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Which backend(s) a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Every registered backend, in priority order, until one succeeds.
    Auto,
    /// Exactly this backend.
    Only(BackendKind),
}

impl FromStr for Method {
    type Err = Html2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(AUTO_METHOD) {
            return Ok(Method::Auto);
        }
        s.parse::<BackendKind>()
            .map(Method::Only)
            .map_err(|e| match e {
                Html2PdfError::UnknownBackend { name, expected } => Html2PdfError::UnknownBackend {
                    name,
                    expected: format!("{AUTO_METHOD}, {expected}"),
                },
                other => other,
            })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Auto => f.write_str(AUTO_METHOD),
            Method::Only(kind) => write!(f, "{kind}"),
        }
    }
}

/// Runs conversion requests against a fixed set of backends.
///
/// Build one with [`Converter::builder`], or use [`Converter::default`] for
/// the four built-in backends in their default priority order.
#[derive(Clone)]
pub struct Converter {
    /// Registered backends, one per kind, in registration order.
    backends: Vec<Arc<dyn Backend>>,
    /// The auto-mode sequence. Every entry is registered.
    priority: Vec<BackendKind>,
    /// Options before a request's overrides are applied.
    defaults: BackendOptions,
    progress: ProgressCallback,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.kind()).collect::<Vec<_>>(),
            )
            .field("priority", &self.priority)
            .field("defaults", &self.defaults)
            .field("progress", &"<callback>")
            .finish()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            priority: DEFAULT_PRIORITY.to_vec(),
            defaults: BackendOptions::default(),
            progress: Arc::new(NoopProgressCallback),
        }
    }
}

impl Converter {
    /// Create a new builder for `Converter`.
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    /// The auto-mode sequence.
    pub fn priority(&self) -> &[BackendKind] {
        &self.priority
    }

    fn backend(&self, kind: BackendKind) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.kind() == kind)
    }

    /// Probe every registered backend's dependency without converting.
    ///
    /// Results follow registration order. `Err` carries the reason the
    /// backend would fail before reaching its engine.
    pub fn available(&self) -> Vec<(BackendKind, Result<(), BackendError>)> {
        self.backends
            .iter()
            .map(|b| (b.kind(), b.check(&self.defaults)))
            .collect()
    }

    /// Convert `request.input` to PDF.
    ///
    /// # Returns
    /// `Ok(ConversionReport)` once a backend has written the PDF.
    ///
    /// # Errors
    /// - [`Html2PdfError::InputNotFound`] before any backend runs
    /// - [`Html2PdfError::UnknownBackend`] before any backend runs
    /// - [`Html2PdfError::InvalidOptions`] when the overrides are out of range
    /// - [`Html2PdfError::BackendFailed`] when the explicitly requested backend fails
    /// - [`Html2PdfError::AllBackendsFailed`] when every auto-mode backend fails
    pub async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionReport, Html2PdfError> {
        let total_start = Instant::now();
        info!("Starting conversion: {}", request.input.display());

        // ── Step 1: Input must exist ─────────────────────────────────────────
        let is_file = tokio::fs::metadata(&request.input)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(Html2PdfError::InputNotFound {
                path: request.input.clone(),
            });
        }
        let input = absolute(&request.input)?;

        // ── Step 2: Resolve the output path once ────────────────────────────
        let output = absolute(&request.output_path())?;
        debug!("Output path: {}", output.display());

        // ── Step 3: Resolve the method ───────────────────────────────────────
        let method: Method = request.method.parse()?;
        let sequence = self.sequence(method)?;

        // ── Step 4: Effective options ────────────────────────────────────────
        let options = self.defaults.clone().merged(&request.overrides)?;
        let job = ConversionJob {
            input,
            output,
            options,
        };

        // ── Step 5: Attempt backends in order ────────────────────────────────
        self.progress.on_conversion_start(&job.input, &job.output);
        let total = sequence.len();
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(total);

        for (i, backend) in sequence.iter().enumerate() {
            let kind = backend.kind();
            info!("Trying {kind} ({}/{total})", i + 1);
            self.progress.on_attempt_start(kind, i + 1, total);

            let start = Instant::now();
            let result = backend.attempt(&job).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    info!("{kind} wrote {} in {duration_ms}ms", job.output.display());
                    self.progress
                        .on_attempt_success(kind, &job.output, duration_ms);
                    attempts.push(AttemptRecord {
                        backend: kind,
                        error: None,
                        duration_ms,
                    });
                    self.progress.on_conversion_complete(true, attempts.len());
                    return Ok(ConversionReport {
                        input: job.input,
                        output: job.output,
                        backend: kind,
                        attempts,
                        total_duration_ms: total_start.elapsed().as_millis() as u64,
                    });
                }
                Err(e) => {
                    warn!("{e}");
                    self.progress.on_attempt_failure(kind, &e, duration_ms);
                    attempts.push(AttemptRecord {
                        backend: kind,
                        error: Some(e),
                        duration_ms,
                    });
                }
            }
        }

        // ── Step 6: Nothing worked ───────────────────────────────────────────
        self.progress.on_conversion_complete(false, attempts.len());
        let mut errors: Vec<BackendError> = attempts.into_iter().filter_map(|a| a.error).collect();
        Err(match method {
            Method::Only(_) if errors.len() == 1 => Html2PdfError::BackendFailed(errors.remove(0)),
            _ => Html2PdfError::AllBackendsFailed { attempts: errors },
        })
    }

    /// Blocking wrapper around [`Converter::convert`].
    ///
    /// Creates a temporary tokio runtime internally, so it must not be called
    /// from inside an async context.
    pub fn convert_sync(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionReport, Html2PdfError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| Html2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert(request))
    }

    fn sequence(&self, method: Method) -> Result<Vec<&Arc<dyn Backend>>, Html2PdfError> {
        match method {
            Method::Auto => Ok(self
                .priority
                .iter()
                .filter_map(|k| self.backend(*k))
                .collect()),
            Method::Only(kind) => self
                .backend(kind)
                .map(|b| vec![b])
                .ok_or_else(|| Html2PdfError::UnknownBackend {
                    name: kind.to_string(),
                    expected: self.registered_names(),
                }),
        }
    }

    fn registered_names(&self) -> String {
        std::iter::once(AUTO_METHOD)
            .chain(self.backends.iter().map(|b| b.kind().name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builder for [`Converter`].
#[derive(Default)]
pub struct ConverterBuilder {
    backends: Option<Vec<Arc<dyn Backend>>>,
    priority: Option<Vec<BackendKind>>,
    defaults: Option<BackendOptions>,
    progress: Option<ProgressCallback>,
}

impl ConverterBuilder {
    /// Register a backend, replacing any already registered for its kind.
    ///
    /// Once any backend is registered, the built-in set is no longer added.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        let list = self.backends.get_or_insert_with(Vec::new);
        list.retain(|b| b.kind() != backend.kind());
        list.push(backend);
        self
    }

    /// Register several backends (see [`ConverterBuilder::backend`]).
    pub fn backends(mut self, backends: impl IntoIterator<Item = Arc<dyn Backend>>) -> Self {
        for b in backends {
            self = self.backend(b);
        }
        self
    }

    /// Set the auto-mode sequence. Kinds left out are never tried in auto
    /// mode but can still be requested explicitly.
    pub fn priority(mut self, order: impl IntoIterator<Item = BackendKind>) -> Self {
        self.priority = Some(order.into_iter().collect());
        self
    }

    /// Replace the built-in default options.
    pub fn defaults(mut self, defaults: BackendOptions) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    /// Build the converter, validating the priority list and defaults.
    pub fn build(self) -> Result<Converter, Html2PdfError> {
        let backends = self.backends.unwrap_or_else(default_backends);
        let registered = |k: &BackendKind| backends.iter().any(|b| b.kind() == *k);

        let priority = match self.priority {
            Some(order) => {
                if order.is_empty() {
                    return Err(Html2PdfError::InvalidOptions(
                        "priority order must name at least one backend".into(),
                    ));
                }
                for (i, k) in order.iter().enumerate() {
                    if order[..i].contains(k) {
                        return Err(Html2PdfError::InvalidOptions(format!(
                            "backend '{k}' appears more than once in the priority order"
                        )));
                    }
                    if !registered(k) {
                        return Err(Html2PdfError::InvalidOptions(format!(
                            "backend '{k}' is in the priority order but not registered"
                        )));
                    }
                }
                order
            }
            None => {
                // Built-in order first, then any remaining registrations.
                let mut order: Vec<BackendKind> =
                    DEFAULT_PRIORITY.into_iter().filter(|k| registered(k)).collect();
                for b in &backends {
                    if !order.contains(&b.kind()) {
                        order.push(b.kind());
                    }
                }
                order
            }
        };

        let defaults = self.defaults.unwrap_or_default();
        defaults.validate()?;

        Ok(Converter {
            backends,
            priority,
            defaults,
            progress: self
                .progress
                .unwrap_or_else(|| Arc::new(NoopProgressCallback)),
        })
    }
}

/// Convert `input` to PDF with the built-in backends, reporting only whether
/// it worked.
///
/// `output` defaults to the input path with a `.pdf` extension; `method` is
/// `auto` or a backend name. Blocking: see [`Converter::convert_sync`].
///
/// The reason for a `false` is only emitted as a `tracing` error event, so a
/// caller with no subscriber installed sees nothing. Call
/// [`Converter::convert`] directly when the [`Html2PdfError`] is needed.
pub fn html_to_pdf(input: impl AsRef<Path>, output: Option<&Path>, method: &str) -> bool {
    let mut request = ConversionRequest::new(input.as_ref());
    request.output = output.map(Path::to_path_buf);
    request.method = method.to_string();

    match Converter::default().convert_sync(&request) {
        Ok(report) => {
            info!(
                "PDF created with {}: {}",
                report.backend,
                report.output.display()
            );
            true
        }
        Err(e) => {
            error!("{e}");
            false
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, Html2PdfError> {
    std::path::absolute(path).map_err(|e| {
        Html2PdfError::Internal(format!("cannot resolve '{}': {e}", path.display()))
    })
}
