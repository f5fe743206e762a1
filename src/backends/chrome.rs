//! headless-chrome backend: launches Chrome and drives it over the DevTools
//! protocol with the blocking `headless_chrome` driver.
//!
//! The driver is synchronous, so the whole launch → navigate → settle →
//! print sequence runs on a `spawn_blocking` thread. The browser process is
//! owned by that thread and killed when the `Browser` handle drops, whether
//! printing succeeded or not.

use super::{Backend, BackendKind, ConversionJob};
use crate::config::BackendOptions;
use crate::error::BackendError;
use futures::future::BoxFuture;
use futures::FutureExt;

const KIND: BackendKind = BackendKind::HeadlessChrome;

/// The headless-chrome adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessChromeBackend;

impl Backend for HeadlessChromeBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn check(&self, options: &BackendOptions) -> Result<(), BackendError> {
        imp::check(options)
    }

    fn attempt<'a>(&'a self, job: &'a ConversionJob) -> BoxFuture<'a, Result<(), BackendError>> {
        imp::attempt(job).boxed()
    }
}

#[cfg(feature = "chrome")]
mod imp {
    use super::KIND;
    use crate::backends::{engine_missing, write_pdf_atomic, ConversionJob};
    use crate::config::{BackendOptions, BrowserOptions};
    use crate::error::BackendError;
    use headless_chrome::types::PrintToPdfOptions;
    use headless_chrome::{Browser, LaunchOptions};
    use std::ffi::OsStr;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tracing::debug;

    /// How long the driver waits on an idle browser before giving up.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    pub(super) fn check(options: &BackendOptions) -> Result<(), BackendError> {
        locate(&options.headless_chrome).map(|_| ())
    }

    fn locate(opts: &BrowserOptions) -> Result<PathBuf, BackendError> {
        engine_probe::locate_with(&engine_probe::CHROME, opts.binary.as_deref())
            .map_err(|e| engine_missing(KIND, &engine_probe::CHROME, e))
    }

    pub(super) async fn attempt(job: &ConversionJob) -> Result<(), BackendError> {
        let opts = job.options.headless_chrome.clone();
        let chrome = locate(&opts)?;
        let url = job.input_url(KIND)?;

        let bytes = tokio::task::spawn_blocking(move || print_blocking(&chrome, &url, &opts))
            .await
            .map_err(|e| BackendError::failed(KIND, format!("driver task failed: {e}")))??;

        write_pdf_atomic(KIND, &job.output, &bytes).await
    }

    fn print_blocking(
        chrome: &Path,
        url: &str,
        opts: &BrowserOptions,
    ) -> Result<Vec<u8>, BackendError> {
        let args: Vec<&OsStr> = opts.args.iter().map(OsStr::new).collect();
        let launch = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(opts.sandbox)
            .path(Some(chrome.to_path_buf()))
            .args(args)
            .idle_browser_timeout(IDLE_TIMEOUT + Duration::from_millis(opts.settle_ms))
            .build()
            .map_err(|e| BackendError::failed(KIND, format!("invalid launch options: {e}")))?;

        debug!("{KIND}: launching {}", chrome.display());
        let browser = Browser::new(launch)
            .map_err(|e| BackendError::failed(KIND, format!("failed to launch Chrome: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BackendError::failed(KIND, format!("failed to open a tab: {e}")))?;

        tab.navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| BackendError::failed(KIND, format!("failed to load {url}: {e}")))?;

        debug!("{KIND}: page loaded, settling for {} ms", opts.settle_ms);
        std::thread::sleep(Duration::from_millis(opts.settle_ms));

        let p = &opts.print;
        let pdf_options = PrintToPdfOptions {
            landscape: Some(p.landscape),
            display_header_footer: Some(p.display_header_footer),
            print_background: Some(p.print_background),
            prefer_css_page_size: Some(p.prefer_css_page_size),
            scale: Some(p.scale),
            paper_width: Some(p.paper_width_in),
            paper_height: Some(p.paper_height_in),
            margin_top: Some(p.margin_top_in),
            margin_bottom: Some(p.margin_bottom_in),
            margin_left: Some(p.margin_left_in),
            margin_right: Some(p.margin_right_in),
            ..Default::default()
        };
        tab.print_to_pdf(Some(pdf_options))
            .map_err(|e| BackendError::failed(KIND, format!("print to PDF failed: {e}")))
    }
}

#[cfg(not(feature = "chrome"))]
mod imp {
    use super::KIND;
    use crate::backends::{feature_missing, ConversionJob};
    use crate::config::BackendOptions;
    use crate::error::BackendError;

    pub(super) fn check(_: &BackendOptions) -> Result<(), BackendError> {
        Err(feature_missing(KIND, "chrome", "headless_chrome"))
    }

    pub(super) async fn attempt(_: &ConversionJob) -> Result<(), BackendError> {
        Err(feature_missing(KIND, "chrome", "headless_chrome"))
    }
}
