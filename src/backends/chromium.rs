//! chromium backend: async CDP client (`chromiumoxide`) with a direct
//! `Page.printToPDF` call.
//!
//! The CDP connection needs its handler polled for as long as the browser
//! is in use, so it runs on its own task. Teardown always closes the browser
//! and stops that task before the attempt returns.

use super::{Backend, BackendKind, ConversionJob};
use crate::config::BackendOptions;
use crate::error::BackendError;
use futures::future::BoxFuture;
use futures::FutureExt;

const KIND: BackendKind = BackendKind::Chromium;

/// The chromium adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumBackend;

impl Backend for ChromiumBackend {
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

#[cfg(feature = "chromium")]
mod imp {
    use super::KIND;
    use crate::backends::{engine_missing, write_pdf_atomic, ConversionJob};
    use crate::config::{BackendOptions, BrowserOptions};
    use crate::error::BackendError;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
    use futures::StreamExt;
    use std::path::PathBuf;
    use std::time::Duration;
    use tracing::{debug, warn};

    pub(super) fn check(options: &BackendOptions) -> Result<(), BackendError> {
        locate(&options.chromium).map(|_| ())
    }

    fn locate(opts: &BrowserOptions) -> Result<PathBuf, BackendError> {
        engine_probe::locate_with(&engine_probe::CHROME, opts.binary.as_deref())
            .map_err(|e| engine_missing(KIND, &engine_probe::CHROME, e))
    }

    pub(super) async fn attempt(job: &ConversionJob) -> Result<(), BackendError> {
        let opts = &job.options.chromium;
        let chrome = locate(opts)?;
        let url = job.input_url(KIND)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome)
            .args(opts.args.iter());
        if !opts.sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder
            .build()
            .map_err(|e| BackendError::failed(KIND, format!("invalid browser config: {e}")))?;

        debug!("{KIND}: launching {}", chrome.display());
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BackendError::failed(KIND, format!("failed to launch Chromium: {e}")))?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let printed = print_page(&browser, &url, opts).await;

        // ── Teardown (every path) ───────────────────────────────────────
        if let Err(e) = browser.close().await {
            warn!("{KIND}: close failed: {e}");
        }
        if let Err(e) = browser.wait().await {
            warn!("{KIND}: wait for exit failed: {e}");
        }
        handler_task.abort();
        let _ = handler_task.await;

        let bytes = printed?;
        write_pdf_atomic(KIND, &job.output, &bytes).await
    }

    async fn print_page(
        browser: &Browser,
        url: &str,
        opts: &BrowserOptions,
    ) -> Result<Vec<u8>, BackendError> {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| BackendError::failed(KIND, format!("failed to load {url}: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| BackendError::failed(KIND, format!("navigation failed: {e}")))?;

        debug!("{KIND}: page loaded, settling for {} ms", opts.settle_ms);
        tokio::time::sleep(Duration::from_millis(opts.settle_ms)).await;

        let p = &opts.print;
        let params = PrintToPdfParams {
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
        page.pdf(params)
            .await
            .map_err(|e| BackendError::failed(KIND, format!("print to PDF failed: {e}")))
    }
}

#[cfg(not(feature = "chromium"))]
mod imp {
    use super::KIND;
    use crate::backends::{feature_missing, ConversionJob};
    use crate::config::BackendOptions;
    use crate::error::BackendError;

    pub(super) fn check(_: &BackendOptions) -> Result<(), BackendError> {
        Err(feature_missing(KIND, "chromium", "chromiumoxide"))
    }

    pub(super) async fn attempt(_: &ConversionJob) -> Result<(), BackendError> {
        Err(feature_missing(KIND, "chromium", "chromiumoxide"))
    }
}
