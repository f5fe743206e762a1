//! WeasyPrint backend: CSS-aware layout engine driven through its CLI.
//!
//! WeasyPrint honours `@page` rules, so print layout is controlled by a
//! generated stylesheet passed with `-s` rather than by command-line page
//! options. The stylesheet lives in a [`tempfile`] that is removed when the
//! attempt returns, on every path.

use super::process::run_engine;
use super::{engine_missing, Backend, BackendKind, ConversionJob, StagedOutput};
use crate::config::{BackendOptions, WeasyPrintOptions};
use crate::error::BackendError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

const KIND: BackendKind = BackendKind::WeasyPrint;

/// The WeasyPrint adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeasyPrintBackend;

impl Backend for WeasyPrintBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn check(&self, options: &BackendOptions) -> Result<(), BackendError> {
        locate(&options.weasyprint).map(|_| ())
    }

    fn attempt<'a>(&'a self, job: &'a ConversionJob) -> BoxFuture<'a, Result<(), BackendError>> {
        attempt(job).boxed()
    }
}

fn locate(opts: &WeasyPrintOptions) -> Result<PathBuf, BackendError> {
    engine_probe::locate_with(&engine_probe::WEASYPRINT, opts.binary.as_deref())
        .map_err(|e| engine_missing(KIND, &engine_probe::WEASYPRINT, e))
}

async fn attempt(job: &ConversionJob) -> Result<(), BackendError> {
    let opts = &job.options.weasyprint;
    let program = locate(opts)?;

    let mut stylesheet = tempfile::Builder::new()
        .prefix("html2pdf-print-")
        .suffix(".css")
        .tempfile()
        .map_err(|e| BackendError::failed(KIND, format!("cannot create stylesheet: {e}")))?;
    stylesheet
        .write_all(print_stylesheet(opts).as_bytes())
        .and_then(|_| stylesheet.flush())
        .map_err(|e| BackendError::failed(KIND, format!("cannot write stylesheet: {e}")))?;

    let staged = StagedOutput::new(KIND, &job.output).await?;
    let args = build_args(opts, stylesheet.path(), &job.input, staged.path());
    run_engine(KIND, &program, &args).await?;
    staged.commit().await
}

/// The print stylesheet applied on top of the document's own styles.
pub fn print_stylesheet(opts: &WeasyPrintOptions) -> String {
    let mut css = format!(
        "@page {{\n    size: {};\n    margin: {};\n}}\n",
        opts.page_size, opts.margin
    );
    if opts.exact_colors {
        css.push_str(
            "\nbody, * {\n    -webkit-print-color-adjust: exact;\n    \
             print-color-adjust: exact;\n    color-adjust: exact;\n}\n",
        );
    }
    css
}

/// Command-line arguments for one WeasyPrint run.
pub fn build_args(
    opts: &WeasyPrintOptions,
    stylesheet: &Path,
    input: &Path,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-s".into(), stylesheet.into()];
    if let Some(ref extra) = opts.extra_stylesheet {
        args.push("-s".into());
        args.push(extra.into());
    }
    if opts.optimize_images {
        args.push("--optimize-images".into());
    }
    args.push("--jpeg-quality".into());
    args.push(opts.jpeg_quality.to_string().into());
    args.push("--pdf-version".into());
    args.push(opts.pdf_version.clone().into());
    args.push(input.into());
    args.push(output.into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn stylesheet_sets_page_and_colours() {
        let css = print_stylesheet(&WeasyPrintOptions::default());
        assert!(css.contains("size: A4;"));
        assert!(css.contains("margin: 0;"));
        assert!(css.contains("print-color-adjust: exact"));
    }

    #[test]
    fn stylesheet_without_exact_colours() {
        let opts = WeasyPrintOptions {
            exact_colors: false,
            page_size: "letter landscape".into(),
            ..Default::default()
        };
        let css = print_stylesheet(&opts);
        assert!(css.contains("size: letter landscape;"));
        assert!(!css.contains("color-adjust"));
    }

    #[test]
    fn default_args() {
        let args = build_args(
            &WeasyPrintOptions::default(),
            Path::new("/tmp/print.css"),
            Path::new("/in/poster.html"),
            Path::new("/out/poster.pdf"),
        );
        assert_eq!(
            strings(&args),
            vec![
                "-s",
                "/tmp/print.css",
                "--optimize-images",
                "--jpeg-quality",
                "95",
                "--pdf-version",
                "1.7",
                "/in/poster.html",
                "/out/poster.pdf",
            ]
        );
    }

    #[test]
    fn extra_stylesheet_follows_print_stylesheet() {
        let opts = WeasyPrintOptions {
            extra_stylesheet: Some(PathBuf::from("brand.css")),
            optimize_images: false,
            ..Default::default()
        };
        let args = strings(&build_args(
            &opts,
            Path::new("print.css"),
            Path::new("a.html"),
            Path::new("a.pdf"),
        ));
        assert_eq!(&args[..4], &["-s", "print.css", "-s", "brand.css"]);
        assert!(!args.contains(&"--optimize-images".to_string()));
    }

    #[test]
    fn missing_binary_is_dependency_missing() {
        let opts = WeasyPrintOptions {
            binary: Some(PathBuf::from("/definitely/not/weasyprint")),
            ..Default::default()
        };
        let err = locate(&opts).unwrap_err();
        assert!(err.is_dependency_missing());
        assert_eq!(err.backend(), BackendKind::WeasyPrint);
    }
}
