//! # edgequake-html2pdf
//!
//! Convert HTML documents to print-quality PDF by delegating to an external
//! rendering engine: headless Chrome, Chromium over CDP, WeasyPrint or
//! wkhtmltopdf.
//!
//! The crate renders nothing itself. What it provides is the selection
//! policy: run one named backend, or try every backend in priority order
//! and keep the first PDF that comes out.
//!
//! ## Conversion Overview
//!
//! ```text
//! ConversionRequest
//!  │
//!  ├─ 1. Input    must exist, else InputNotFound (no backend runs)
//!  ├─ 2. Output   explicit path, or input with a .pdf extension
//!  ├─ 3. Method   auto | headless-chrome | chromium | weasyprint | wkhtmltopdf
//!  ├─ 4. Options  print-optimised defaults + per-backend overrides
//!  └─ 5. Attempt  auto: first success wins; explicit: exactly one backend
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_html2pdf::{ConversionRequest, Converter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = ConversionRequest::builder("poster.html").build()?;
//!     let report = Converter::default().convert(&request).await?;
//!     eprintln!("{} written by {}", report.output.display(), report.backend);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `cli`      | on      | Enables the `html2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `chrome`   | on      | The `headless-chrome` backend (`headless_chrome` driver) |
//! | `chromium` | on      | The `chromium` backend (`chromiumoxide` CDP client) |
//!
//! A backend whose feature is disabled stays selectable but always fails
//! with [`BackendError::DependencyMissing`], so auto mode simply moves on:
//! ```toml
//! edgequake-html2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Installing Engines
//!
//! | Backend           | Needs                         | Override path with     |
//! |-------------------|-------------------------------|------------------------|
//! | `headless-chrome` | Chrome or Chromium            | `HTML2PDF_CHROME`      |
//! | `chromium`        | Chrome or Chromium            | `HTML2PDF_CHROME`      |
//! | `weasyprint`      | `pip install weasyprint`      | `HTML2PDF_WEASYPRINT`  |
//! | `wkhtmltopdf`     | wkhtmltopdf 0.12.6 (patched Qt) | `HTML2PDF_WKHTMLTOPDF` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backends;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backends::{Backend, BackendKind, ConversionJob, DEFAULT_PRIORITY};
pub use config::{
    default_output_path, BackendOptions, BackendOverrides, BrowserOptions, BrowserOverrides,
    ConversionRequest, ConversionRequestBuilder, PrintOptions, PrintOverrides, WeasyPrintOptions,
    WeasyPrintOverrides, WkhtmltopdfOptions, WkhtmltopdfOverrides,
};
pub use convert::{html_to_pdf, Converter, ConverterBuilder, Method};
pub use error::{BackendError, Html2PdfError};
pub use output::{AttemptRecord, ConversionReport};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
