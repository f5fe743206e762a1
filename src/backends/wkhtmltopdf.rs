//! wkhtmltopdf backend: the Qt WebKit renderer driven with a fixed,
//! print-quality flag set.

use super::process::run_engine;
use super::{engine_missing, Backend, BackendKind, ConversionJob, StagedOutput};
use crate::config::{BackendOptions, WkhtmltopdfOptions};
use crate::error::BackendError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const KIND: BackendKind = BackendKind::Wkhtmltopdf;

/// The wkhtmltopdf adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct WkhtmltopdfBackend;

impl Backend for WkhtmltopdfBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn check(&self, options: &BackendOptions) -> Result<(), BackendError> {
        locate(&options.wkhtmltopdf).map(|_| ())
    }

    fn attempt<'a>(&'a self, job: &'a ConversionJob) -> BoxFuture<'a, Result<(), BackendError>> {
        attempt(job).boxed()
    }
}

fn locate(opts: &WkhtmltopdfOptions) -> Result<PathBuf, BackendError> {
    engine_probe::locate_with(&engine_probe::WKHTMLTOPDF, opts.binary.as_deref())
        .map_err(|e| engine_missing(KIND, &engine_probe::WKHTMLTOPDF, e))
}

async fn attempt(job: &ConversionJob) -> Result<(), BackendError> {
    let opts = &job.options.wkhtmltopdf;
    let program = locate(opts)?;
    let staged = StagedOutput::new(KIND, &job.output).await?;
    let args = build_args(opts, &job.input, staged.path());
    run_engine(KIND, &program, &args).await?;
    staged.commit().await
}

/// Command-line arguments for one wkhtmltopdf run.
pub fn build_args(opts: &WkhtmltopdfOptions, input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<String> = vec!["--quiet".into()];

    let mut flag = |name: &str, value: String| {
        args.push(format!("--{name}"));
        args.push(value);
    };
    flag("page-size", opts.page_size.clone());
    flag("margin-top", opts.margin_top.clone());
    flag("margin-right", opts.margin_right.clone());
    flag("margin-bottom", opts.margin_bottom.clone());
    flag("margin-left", opts.margin_left.clone());
    flag("encoding", opts.encoding.clone());
    flag("dpi", opts.dpi.to_string());
    flag("image-quality", opts.image_quality.to_string());
    flag("image-dpi", opts.image_dpi.to_string());
    flag("zoom", opts.zoom.to_string());
    flag("viewport-size", opts.viewport_size.clone());
    flag("javascript-delay", opts.javascript_delay_ms.to_string());
    flag("load-error-handling", opts.load_error_handling.clone());
    flag("load-media-error-handling", opts.load_media_error_handling.clone());

    args.push(if opts.outline { "--outline" } else { "--no-outline" }.into());
    if opts.enable_local_file_access {
        args.push("--enable-local-file-access".into());
    }
    args.push(
        if opts.print_media_type {
            "--print-media-type"
        } else {
            "--no-print-media-type"
        }
        .into(),
    );
    args.push(
        if opts.smart_shrinking {
            "--enable-smart-shrinking"
        } else {
            "--disable-smart-shrinking"
        }
        .into(),
    );
    if opts.low_quality {
        args.push("--lowquality".into());
    }

    let mut out: Vec<OsString> = args.into_iter().map(OsString::from).collect();
    out.push(input.into());
    out.push(output.into());
    out
}
