//! Fallback-policy tests for `Converter`, run against fake backends.
//!
//! No engine is needed: each fake records that it was invoked and then
//! either writes a tiny PDF or fails the way a real adapter would.

use edgequake_html2pdf::{
    html_to_pdf, Backend, BackendError, BackendKind, ConversionJob, ConversionProgressCallback,
    ConversionRequest, Converter, Html2PdfError, DEFAULT_PRIORITY,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Outcome {
    Succeed,
    Missing,
    Crash,
}

type CallLog = Arc<Mutex<Vec<BackendKind>>>;

struct FakeBackend {
    kind: BackendKind,
    outcome: Outcome,
    calls: CallLog,
}

impl Backend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn attempt<'a>(&'a self, job: &'a ConversionJob) -> BoxFuture<'a, Result<(), BackendError>> {
        async move {
            self.calls.lock().unwrap().push(self.kind);
            match self.outcome {
                Outcome::Succeed => {
                    tokio::fs::write(&job.output, b"%PDF-1.7 fake")
                        .await
                        .map_err(|e| BackendError::OutputWriteFailed {
                            backend: self.kind,
                            path: job.output.clone(),
                            detail: e.to_string(),
                        })
                }
                Outcome::Missing => Err(BackendError::DependencyMissing {
                    backend: self.kind,
                    dependency: format!("{} engine", self.kind),
                    hint: "not installed in tests".into(),
                }),
                Outcome::Crash => Err(BackendError::ConversionFailed {
                    backend: self.kind,
                    detail: "exit status 1".into(),
                }),
            }
        }
        .boxed()
    }
}

/// A converter whose four backends behave as `outcomes` (default priority
/// order), plus the log of which ones ran.
fn converter(outcomes: [Outcome; 4]) -> (Converter, CallLog) {
    let calls: CallLog = Arc::default();
    let backends: Vec<Arc<dyn Backend>> = DEFAULT_PRIORITY
        .iter()
        .zip(outcomes)
        .map(|(kind, outcome)| {
            Arc::new(FakeBackend {
                kind: *kind,
                outcome,
                calls: Arc::clone(&calls),
            }) as Arc<dyn Backend>
        })
        .collect();
    let converter = Converter::builder().backends(backends).build().unwrap();
    (converter, calls)
}

fn html_fixture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "<html><body><h1>Poster</h1></body></html>").unwrap();
    path
}

fn calls(log: &CallLog) -> Vec<BackendKind> {
    log.lock().unwrap().clone()
}

use Outcome::*;

// ── Explicit method ──────────────────────────────────────────────────────────

#[tokio::test]
async fn explicit_method_invokes_exactly_that_backend() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Succeed, Succeed, Succeed, Succeed]);

    let request = ConversionRequest::builder(&input)
        .method("weasyprint")
        .build()
        .unwrap();
    let report = conv.convert(&request).await.unwrap();

    assert_eq!(calls(&log), vec![BackendKind::WeasyPrint]);
    assert_eq!(report.backend, BackendKind::WeasyPrint);
    assert_eq!(report.attempts.len(), 1);
    assert!(dir.path().join("poster.pdf").exists());
}

#[tokio::test]
async fn legacy_method_names_select_their_backend() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Succeed, Succeed, Succeed, Succeed]);

    for (name, kind) in [
        ("selenium", BackendKind::HeadlessChrome),
        ("playwright", BackendKind::Chromium),
        ("pdfkit", BackendKind::Wkhtmltopdf),
    ] {
        log.lock().unwrap().clear();
        let request = ConversionRequest::builder(&input).method(name).build().unwrap();
        conv.convert(&request).await.unwrap();
        assert_eq!(calls(&log), vec![kind], "method {name}");
    }
}

#[tokio::test]
async fn explicit_failure_is_backend_failed_and_nothing_else_runs() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Succeed, Succeed, Succeed, Crash]);

    let request = ConversionRequest::builder(&input)
        .method("wkhtmltopdf")
        .build()
        .unwrap();
    let err = conv.convert(&request).await.unwrap_err();

    assert_eq!(calls(&log), vec![BackendKind::Wkhtmltopdf]);
    match err {
        Html2PdfError::BackendFailed(e) => assert_eq!(e.backend(), BackendKind::Wkhtmltopdf),
        other => panic!("expected BackendFailed, got {other:?}"),
    }
    assert!(!dir.path().join("poster.pdf").exists());
}

// ── Checks that run before any backend ───────────────────────────────────────

#[tokio::test]
async fn unknown_method_invokes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Succeed, Succeed, Succeed, Succeed]);

    let request = ConversionRequest::builder(&input)
        .method("prince")
        .build()
        .unwrap();
    let err = conv.convert(&request).await.unwrap_err();

    assert!(matches!(err, Html2PdfError::UnknownBackend { .. }), "got {err:?}");
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn missing_input_fails_before_any_backend() {
    let dir = tempfile::tempdir().unwrap();
    let (conv, log) = converter([Succeed, Succeed, Succeed, Succeed]);

    let request = ConversionRequest::new(dir.path().join("nope.html"));
    let err = conv.convert(&request).await.unwrap_err();

    assert!(matches!(err, Html2PdfError::InputNotFound { .. }), "got {err:?}");
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn missing_input_wins_over_unknown_method() {
    let dir = tempfile::tempdir().unwrap();
    let (conv, _log) = converter([Succeed, Succeed, Succeed, Succeed]);

    let mut request = ConversionRequest::new(dir.path().join("nope.html"));
    request.method = "prince".into();
    let err = conv.convert(&request).await.unwrap_err();
    assert!(matches!(err, Html2PdfError::InputNotFound { .. }));
}

#[tokio::test]
async fn unregistered_backend_is_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let calls_log: CallLog = Arc::default();
    let conv = Converter::builder()
        .backend(Arc::new(FakeBackend {
            kind: BackendKind::WeasyPrint,
            outcome: Succeed,
            calls: Arc::clone(&calls_log),
        }))
        .build()
        .unwrap();

    let request = ConversionRequest::builder(&input)
        .method("chromium")
        .build()
        .unwrap();
    let err = conv.convert(&request).await.unwrap_err();
    assert!(matches!(err, Html2PdfError::UnknownBackend { .. }));
    assert!(calls_log.lock().unwrap().is_empty());
}

#[test]
fn html_to_pdf_is_false_when_checks_fail() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!html_to_pdf(dir.path().join("missing.html"), None, "auto"));

    let input = html_fixture(dir.path(), "poster.html");
    assert!(!html_to_pdf(&input, None, "prince"));
    assert!(!dir.path().join("poster.pdf").exists());
}

// ── Auto mode ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn auto_stops_at_first_success() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Missing, Crash, Succeed, Succeed]);

    let report = conv.convert(&ConversionRequest::new(&input)).await.unwrap();

    assert_eq!(
        calls(&log),
        vec![
            BackendKind::HeadlessChrome,
            BackendKind::Chromium,
            BackendKind::WeasyPrint
        ]
    );
    assert_eq!(report.backend, BackendKind::WeasyPrint);
    assert_eq!(report.failed_attempts().count(), 2);
    assert!(report.attempts.last().unwrap().succeeded());
}

#[tokio::test]
async fn auto_with_first_backend_working_runs_only_it() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Succeed, Crash, Crash, Crash]);

    conv.convert(&ConversionRequest::new(&input)).await.unwrap();
    assert_eq!(calls(&log), vec![BackendKind::HeadlessChrome]);
}

#[tokio::test]
async fn auto_all_failing_reports_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Missing, Crash, Missing, Crash]);

    let err = conv.convert(&ConversionRequest::new(&input)).await.unwrap_err();

    assert_eq!(calls(&log), DEFAULT_PRIORITY.to_vec());
    match err {
        Html2PdfError::AllBackendsFailed { attempts } => {
            let kinds: Vec<BackendKind> = attempts.iter().map(|e| e.backend()).collect();
            assert_eq!(kinds, DEFAULT_PRIORITY.to_vec());
        }
        other => panic!("expected AllBackendsFailed, got {other:?}"),
    }
    assert!(!dir.path().join("poster.pdf").exists());
}

#[tokio::test]
async fn custom_priority_reorders_and_restricts_auto() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let calls_log: CallLog = Arc::default();
    let fakes: Vec<Arc<dyn Backend>> = DEFAULT_PRIORITY
        .iter()
        .map(|k| {
            Arc::new(FakeBackend {
                kind: *k,
                outcome: Crash,
                calls: Arc::clone(&calls_log),
            }) as Arc<dyn Backend>
        })
        .collect();
    let conv = Converter::builder()
        .backends(fakes)
        .priority([BackendKind::Wkhtmltopdf, BackendKind::Chromium])
        .build()
        .unwrap();

    let err = conv.convert(&ConversionRequest::new(&input)).await.unwrap_err();
    assert!(matches!(err, Html2PdfError::AllBackendsFailed { .. }));
    assert_eq!(
        *calls_log.lock().unwrap(),
        vec![BackendKind::Wkhtmltopdf, BackendKind::Chromium]
    );

    // Kinds outside the auto order stay selectable by name.
    calls_log.lock().unwrap().clear();
    let request = ConversionRequest::builder(&input)
        .method("weasyprint")
        .build()
        .unwrap();
    assert!(conv.convert(&request).await.is_err());
    assert_eq!(*calls_log.lock().unwrap(), vec![BackendKind::WeasyPrint]);
}

// ── Output path & reporting ──────────────────────────────────────────────────

#[tokio::test]
async fn output_path_defaults_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "report.htm");
    let (conv, _log) = converter([Succeed, Succeed, Succeed, Succeed]);

    let report = conv.convert(&ConversionRequest::new(&input)).await.unwrap();
    assert_eq!(report.output, dir.path().join("report.pdf"));
    assert!(report.output.is_absolute());
}

#[tokio::test]
async fn explicit_output_path_is_shared_by_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let out = dir.path().join("high_quality.pdf");

    let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    struct OutputSpy {
        kind: BackendKind,
        seen: Arc<Mutex<Vec<PathBuf>>>,
        succeed: bool,
    }
    impl Backend for OutputSpy {
        fn kind(&self) -> BackendKind {
            self.kind
        }
        fn attempt<'a>(
            &'a self,
            job: &'a ConversionJob,
        ) -> BoxFuture<'a, Result<(), BackendError>> {
            async move {
                self.seen.lock().unwrap().push(job.output.clone());
                if self.succeed {
                    std::fs::write(&job.output, b"%PDF").unwrap();
                    Ok(())
                } else {
                    Err(BackendError::ConversionFailed {
                        backend: self.kind,
                        detail: "no".into(),
                    })
                }
            }
            .boxed()
        }
    }

    let conv = Converter::builder()
        .backend(Arc::new(OutputSpy {
            kind: BackendKind::Chromium,
            seen: Arc::clone(&seen),
            succeed: false,
        }))
        .backend(Arc::new(OutputSpy {
            kind: BackendKind::WeasyPrint,
            seen: Arc::clone(&seen),
            succeed: true,
        }))
        .build()
        .unwrap();

    let request = ConversionRequest::builder(&input).output(&out).build().unwrap();
    conv.convert(&request).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![out.clone(), out.clone()]);
    assert!(out.exists());
}

#[tokio::test]
async fn progress_callback_sees_every_attempt() {
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }
    impl ConversionProgressCallback for Recorder {
        fn on_attempt_start(&self, backend: BackendKind, attempt: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {backend} {attempt}/{total}"));
        }
        fn on_attempt_success(&self, backend: BackendKind, _output: &Path, _ms: u64) {
            self.events.lock().unwrap().push(format!("ok {backend}"));
        }
        fn on_attempt_failure(&self, backend: BackendKind, _e: &BackendError, _ms: u64) {
            self.events.lock().unwrap().push(format!("fail {backend}"));
        }
        fn on_conversion_complete(&self, success: bool, attempts: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {success} {attempts}"));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let recorder = Arc::new(Recorder::default());
    let calls_log: CallLog = Arc::default();
    let conv = Converter::builder()
        .backend(Arc::new(FakeBackend {
            kind: BackendKind::HeadlessChrome,
            outcome: Missing,
            calls: Arc::clone(&calls_log),
        }))
        .backend(Arc::new(FakeBackend {
            kind: BackendKind::Wkhtmltopdf,
            outcome: Succeed,
            calls: Arc::clone(&calls_log),
        }))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    conv.convert(&ConversionRequest::new(&input)).await.unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start headless-chrome 1/2",
            "fail headless-chrome",
            "start wkhtmltopdf 2/2",
            "ok wkhtmltopdf",
            "done true 2",
        ]
    );
}

#[test]
fn convert_sync_runs_without_an_outer_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, log) = converter([Crash, Succeed, Crash, Crash]);

    let report = conv.convert_sync(&ConversionRequest::new(&input)).unwrap();
    assert_eq!(report.backend, BackendKind::Chromium);
    assert_eq!(calls(&log).len(), 2);
}

#[test]
fn report_serialises_for_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = html_fixture(dir.path(), "poster.html");
    let (conv, _log) = converter([Missing, Missing, Succeed, Succeed]);

    let report = tokio_test::block_on(conv.convert(&ConversionRequest::new(&input))).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["backend"], "weasyprint");
    assert_eq!(json["attempts"].as_array().unwrap().len(), 3);
}
