//! Configuration types for HTML-to-PDF conversion.
//!
//! Every backend gets an explicit options struct whose [`Default`] is the
//! fixed, print-optimised configuration for that engine (A4, zero margins,
//! backgrounds preserved, high image quality). Callers never edit those
//! structs directly; they supply a matching *overrides* struct in which every
//! field is optional, and [`BackendOptions::merged`] applies it with
//! "override wins" semantics.
//!
//! Overrides are plain `serde` structs so the CLI can load them from a JSON
//! file:
//!
//! ```json
//! {
//!   "headless_chrome": { "settle_ms": 500, "print": { "landscape": true } },
//!   "wkhtmltopdf":     { "dpi": 150, "javascript_delay_ms": 0 }
//! }
//! ```

use crate::error::Html2PdfError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A4 paper width in inches.
pub const A4_WIDTH_IN: f64 = 8.27;
/// A4 paper height in inches.
pub const A4_HEIGHT_IN: f64 = 11.69;

/// Chrome flags used by the headless-chrome backend.
///
/// Background throttling is disabled so timers and animations finish before
/// the page is printed.
pub const DEFAULT_CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--run-all-compositor-stages-before-draw",
    "--disable-background-timer-throttling",
    "--disable-renderer-backgrounding",
    "--disable-backgrounding-occluded-windows",
];

// ── Browser print options ────────────────────────────────────────────────

/// Page-level print parameters shared by both browser backends.
///
/// These map one-to-one onto the DevTools `Page.printToPDF` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintOptions {
    pub landscape: bool,
    pub display_header_footer: bool,
    /// Print background colours and images. Default: true.
    pub print_background: bool,
    /// Let a CSS `@page { size }` rule win over the paper size below.
    pub prefer_css_page_size: bool,
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub margin_top_in: f64,
    pub margin_bottom_in: f64,
    pub margin_left_in: f64,
    pub margin_right_in: f64,
    /// Rendering scale. Range: 0.1–2.0. Default: 1.0.
    pub scale: f64,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            landscape: false,
            display_header_footer: false,
            print_background: true,
            prefer_css_page_size: true,
            paper_width_in: A4_WIDTH_IN,
            paper_height_in: A4_HEIGHT_IN,
            margin_top_in: 0.0,
            margin_bottom_in: 0.0,
            margin_left_in: 0.0,
            margin_right_in: 0.0,
            scale: 1.0,
        }
    }
}

/// Optional replacements for [`PrintOptions`] fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrintOverrides {
    pub landscape: Option<bool>,
    pub display_header_footer: Option<bool>,
    pub print_background: Option<bool>,
    pub prefer_css_page_size: Option<bool>,
    pub paper_width_in: Option<f64>,
    pub paper_height_in: Option<f64>,
    pub margin_top_in: Option<f64>,
    pub margin_bottom_in: Option<f64>,
    pub margin_left_in: Option<f64>,
    pub margin_right_in: Option<f64>,
    pub scale: Option<f64>,
}

impl PrintOptions {
    fn merge(&mut self, o: &PrintOverrides) {
        set(&mut self.landscape, &o.landscape);
        set(&mut self.display_header_footer, &o.display_header_footer);
        set(&mut self.print_background, &o.print_background);
        set(&mut self.prefer_css_page_size, &o.prefer_css_page_size);
        set(&mut self.paper_width_in, &o.paper_width_in);
        set(&mut self.paper_height_in, &o.paper_height_in);
        set(&mut self.margin_top_in, &o.margin_top_in);
        set(&mut self.margin_bottom_in, &o.margin_bottom_in);
        set(&mut self.margin_left_in, &o.margin_left_in);
        set(&mut self.margin_right_in, &o.margin_right_in);
        set(&mut self.scale, &o.scale);
    }

    fn validate(&self, backend: &str) -> Result<(), Html2PdfError> {
        if !(0.1..=2.0).contains(&self.scale) {
            return Err(Html2PdfError::InvalidOptions(format!(
                "{backend}: scale must be 0.1–2.0, got {}",
                self.scale
            )));
        }
        if ![self.paper_width_in, self.paper_height_in]
            .iter()
            .all(|d| d.is_finite() && *d > 0.0)
        {
            return Err(Html2PdfError::InvalidOptions(format!(
                "{backend}: paper size must be positive, got {}×{} in",
                self.paper_width_in, self.paper_height_in
            )));
        }
        let margins = [
            self.margin_top_in,
            self.margin_bottom_in,
            self.margin_left_in,
            self.margin_right_in,
        ];
        if !margins.iter().all(|m| m.is_finite() && *m >= 0.0) {
            return Err(Html2PdfError::InvalidOptions(format!(
                "{backend}: margins must be finite and not negative"
            )));
        }
        Ok(())
    }
}

// ── Per-backend options ──────────────────────────────────────────────────

/// Options for the two Chrome-based backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserOptions {
    pub print: PrintOptions,
    /// Fixed wait after navigation so scripts, fonts and animations settle.
    pub settle_ms: u64,
    /// Keep Chrome's sandbox enabled. Default: false (containers and CI
    /// runners usually cannot provide it).
    pub sandbox: bool,
    /// Extra command-line flags passed to Chrome.
    pub args: Vec<String>,
    /// Explicit Chrome executable; otherwise located by `engine-probe`.
    pub binary: Option<PathBuf>,
}

impl BrowserOptions {
    /// Defaults for the DevTools-driven headless-chrome backend.
    pub fn headless_chrome() -> Self {
        Self {
            print: PrintOptions::default(),
            settle_ms: 3000,
            sandbox: false,
            args: DEFAULT_CHROME_ARGS.iter().map(|s| s.to_string()).collect(),
            binary: None,
        }
    }

    /// Defaults for the async chromium backend.
    pub fn chromium() -> Self {
        Self {
            print: PrintOptions::default(),
            settle_ms: 2000,
            sandbox: false,
            args: Vec::new(),
            binary: None,
        }
    }

    fn merge(&mut self, o: &BrowserOverrides) {
        self.print.merge(&o.print);
        set(&mut self.settle_ms, &o.settle_ms);
        set(&mut self.sandbox, &o.sandbox);
        set(&mut self.args, &o.args);
        if let Some(ref b) = o.binary {
            self.binary = Some(b.clone());
        }
    }
}

/// Optional replacements for [`BrowserOptions`] fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserOverrides {
    pub print: PrintOverrides,
    pub settle_ms: Option<u64>,
    pub sandbox: Option<bool>,
    pub args: Option<Vec<String>>,
    pub binary: Option<PathBuf>,
}

/// Options for the WeasyPrint backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeasyPrintOptions {
    /// CSS `@page` size, e.g. `A4`, `letter`, `210mm 297mm`.
    pub page_size: String,
    /// CSS `@page` margin.
    pub margin: String,
    /// Force exact colour reproduction (`print-color-adjust: exact`).
    pub exact_colors: bool,
    pub optimize_images: bool,
    /// JPEG quality used when re-encoding images. Range: 0–100. Default: 95.
    pub jpeg_quality: u8,
    pub pdf_version: String,
    /// Additional user stylesheet applied after the print stylesheet.
    pub extra_stylesheet: Option<PathBuf>,
    /// Explicit `weasyprint` executable; otherwise located by `engine-probe`.
    pub binary: Option<PathBuf>,
}

impl Default for WeasyPrintOptions {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            margin: "0".to_string(),
            exact_colors: true,
            optimize_images: true,
            jpeg_quality: 95,
            pdf_version: "1.7".to_string(),
            extra_stylesheet: None,
            binary: None,
        }
    }
}

impl WeasyPrintOptions {
    fn merge(&mut self, o: &WeasyPrintOverrides) {
        set(&mut self.page_size, &o.page_size);
        set(&mut self.margin, &o.margin);
        set(&mut self.exact_colors, &o.exact_colors);
        set(&mut self.optimize_images, &o.optimize_images);
        set(&mut self.jpeg_quality, &o.jpeg_quality);
        set(&mut self.pdf_version, &o.pdf_version);
        if let Some(ref s) = o.extra_stylesheet {
            self.extra_stylesheet = Some(s.clone());
        }
        if let Some(ref b) = o.binary {
            self.binary = Some(b.clone());
        }
    }
}

/// Optional replacements for [`WeasyPrintOptions`] fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeasyPrintOverrides {
    pub page_size: Option<String>,
    pub margin: Option<String>,
    pub exact_colors: Option<bool>,
    pub optimize_images: Option<bool>,
    pub jpeg_quality: Option<u8>,
    pub pdf_version: Option<String>,
    pub extra_stylesheet: Option<PathBuf>,
    pub binary: Option<PathBuf>,
}

/// Options for the wkhtmltopdf backend. Field names follow the flags they
/// produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WkhtmltopdfOptions {
    pub page_size: String,
    pub margin_top: String,
    pub margin_right: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub encoding: String,
    /// Emit a PDF outline (`--outline`). Default: false.
    pub outline: bool,
    pub enable_local_file_access: bool,
    pub print_media_type: bool,
    /// Default: false, i.e. `--disable-smart-shrinking`.
    pub smart_shrinking: bool,
    pub dpi: u32,
    /// JPEG image quality. Range: 0–100. Default: 100.
    pub image_quality: u8,
    pub image_dpi: u32,
    pub low_quality: bool,
    pub zoom: f64,
    pub viewport_size: String,
    /// Wait for JavaScript to finish, in milliseconds.
    pub javascript_delay_ms: u64,
    pub load_error_handling: String,
    pub load_media_error_handling: String,
    /// Explicit `wkhtmltopdf` executable; otherwise located by `engine-probe`.
    pub binary: Option<PathBuf>,
}

impl Default for WkhtmltopdfOptions {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            margin_top: "0".to_string(),
            margin_right: "0".to_string(),
            margin_bottom: "0".to_string(),
            margin_left: "0".to_string(),
            encoding: "UTF-8".to_string(),
            outline: false,
            enable_local_file_access: true,
            print_media_type: true,
            smart_shrinking: false,
            dpi: 300,
            image_quality: 100,
            image_dpi: 300,
            low_quality: false,
            zoom: 1.0,
            viewport_size: "1280x1024".to_string(),
            javascript_delay_ms: 1000,
            load_error_handling: "ignore".to_string(),
            load_media_error_handling: "ignore".to_string(),
            binary: None,
        }
    }
}

impl WkhtmltopdfOptions {
    fn merge(&mut self, o: &WkhtmltopdfOverrides) {
        set(&mut self.page_size, &o.page_size);
        set(&mut self.margin_top, &o.margin_top);
        set(&mut self.margin_right, &o.margin_right);
        set(&mut self.margin_bottom, &o.margin_bottom);
        set(&mut self.margin_left, &o.margin_left);
        set(&mut self.encoding, &o.encoding);
        set(&mut self.outline, &o.outline);
        set(&mut self.enable_local_file_access, &o.enable_local_file_access);
        set(&mut self.print_media_type, &o.print_media_type);
        set(&mut self.smart_shrinking, &o.smart_shrinking);
        set(&mut self.dpi, &o.dpi);
        set(&mut self.image_quality, &o.image_quality);
        set(&mut self.image_dpi, &o.image_dpi);
        set(&mut self.low_quality, &o.low_quality);
        set(&mut self.zoom, &o.zoom);
        set(&mut self.viewport_size, &o.viewport_size);
        set(&mut self.javascript_delay_ms, &o.javascript_delay_ms);
        set(&mut self.load_error_handling, &o.load_error_handling);
        set(&mut self.load_media_error_handling, &o.load_media_error_handling);
        if let Some(ref b) = o.binary {
            self.binary = Some(b.clone());
        }
    }
}

/// Optional replacements for [`WkhtmltopdfOptions`] fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WkhtmltopdfOverrides {
    pub page_size: Option<String>,
    pub margin_top: Option<String>,
    pub margin_right: Option<String>,
    pub margin_bottom: Option<String>,
    pub margin_left: Option<String>,
    pub encoding: Option<String>,
    pub outline: Option<bool>,
    pub enable_local_file_access: Option<bool>,
    pub print_media_type: Option<bool>,
    pub smart_shrinking: Option<bool>,
    pub dpi: Option<u32>,
    pub image_quality: Option<u8>,
    pub image_dpi: Option<u32>,
    pub low_quality: Option<bool>,
    pub zoom: Option<f64>,
    pub viewport_size: Option<String>,
    pub javascript_delay_ms: Option<u64>,
    pub load_error_handling: Option<String>,
    pub load_media_error_handling: Option<String>,
    pub binary: Option<PathBuf>,
}

// ── Aggregates ───────────────────────────────────────────────────────────

/// The effective options for every backend of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendOptions {
    pub headless_chrome: BrowserOptions,
    pub chromium: BrowserOptions,
    pub weasyprint: WeasyPrintOptions,
    pub wkhtmltopdf: WkhtmltopdfOptions,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            headless_chrome: BrowserOptions::headless_chrome(),
            chromium: BrowserOptions::chromium(),
            weasyprint: WeasyPrintOptions::default(),
            wkhtmltopdf: WkhtmltopdfOptions::default(),
        }
    }
}

impl BackendOptions {
    /// Apply `overrides` on top of `self` and validate the result.
    pub fn merged(mut self, overrides: &BackendOverrides) -> Result<Self, Html2PdfError> {
        self.headless_chrome.merge(&overrides.headless_chrome);
        self.chromium.merge(&overrides.chromium);
        self.weasyprint.merge(&overrides.weasyprint);
        self.wkhtmltopdf.merge(&overrides.wkhtmltopdf);
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges that the engines would otherwise reject with an
    /// obscure message (or silently clamp).
    pub fn validate(&self) -> Result<(), Html2PdfError> {
        self.headless_chrome.print.validate("headless_chrome")?;
        self.chromium.print.validate("chromium")?;
        if self.weasyprint.jpeg_quality > 100 {
            return Err(Html2PdfError::InvalidOptions(format!(
                "weasyprint: jpeg_quality must be 0–100, got {}",
                self.weasyprint.jpeg_quality
            )));
        }
        let wk = &self.wkhtmltopdf;
        if wk.image_quality > 100 {
            return Err(Html2PdfError::InvalidOptions(format!(
                "wkhtmltopdf: image_quality must be 0–100, got {}",
                wk.image_quality
            )));
        }
        if wk.dpi == 0 || wk.image_dpi == 0 {
            return Err(Html2PdfError::InvalidOptions(
                "wkhtmltopdf: dpi and image_dpi must be ≥ 1".into(),
            ));
        }
        if !(wk.zoom.is_finite() && wk.zoom > 0.0) {
            return Err(Html2PdfError::InvalidOptions(format!(
                "wkhtmltopdf: zoom must be positive, got {}",
                wk.zoom
            )));
        }
        Ok(())
    }
}

/// Per-backend overrides, as loaded from an options file.
///
/// The legacy tool names (`selenium`, `playwright`, `pdfkit`) are accepted
/// as keys for the corresponding backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendOverrides {
    #[serde(alias = "selenium", alias = "headless-chrome")]
    pub headless_chrome: BrowserOverrides,
    #[serde(alias = "playwright")]
    pub chromium: BrowserOverrides,
    pub weasyprint: WeasyPrintOverrides,
    #[serde(alias = "pdfkit")]
    pub wkhtmltopdf: WkhtmltopdfOverrides,
}

impl BackendOverrides {
    /// Parse overrides from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and parse an overrides file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Html2PdfError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Html2PdfError::OptionsFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_json_str(&text).map_err(|e| Html2PdfError::OptionsFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

// ── Request ──────────────────────────────────────────────────────────────

/// The method string meaning "try every backend in priority order".
pub const AUTO_METHOD: &str = "auto";

/// One conversion: which file, where to, and with which backend(s).
///
/// Built via [`ConversionRequest::new`] or [`ConversionRequest::builder`].
///
/// # Example
/// ```rust
/// use edgequake_html2pdf::ConversionRequest;
///
/// let request = ConversionRequest::builder("poster.html")
///     .method("weasyprint")
///     .build()
///     .unwrap();
/// assert_eq!(request.output_path(), std::path::PathBuf::from("poster.pdf"));
/// ```
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Input HTML document. Must exist when the conversion starts.
    pub input: PathBuf,
    /// Output PDF path. `None` means "input with a `.pdf` extension".
    pub output: Option<PathBuf>,
    /// `auto` or a backend name / alias. Default: `auto`.
    pub method: String,
    /// Per-backend option overrides.
    pub overrides: BackendOverrides,
}

impl ConversionRequest {
    /// A request for `input` with default output path and `auto` method.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            method: AUTO_METHOD.to_string(),
            overrides: BackendOverrides::default(),
        }
    }

    /// Create a new builder for `ConversionRequest`.
    pub fn builder(input: impl Into<PathBuf>) -> ConversionRequestBuilder {
        ConversionRequestBuilder {
            request: Self::new(input),
        }
    }

    /// The output path: the explicit one, or [`default_output_path`].
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// Builder for [`ConversionRequest`].
#[derive(Debug)]
pub struct ConversionRequestBuilder {
    request: ConversionRequest,
}

impl ConversionRequestBuilder {
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.request.output = Some(output.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request.method = method.into();
        self
    }

    pub fn overrides(mut self, overrides: BackendOverrides) -> Self {
        self.request.overrides = overrides;
        self
    }

    /// Build the request, validating the overrides against the defaults.
    pub fn build(self) -> Result<ConversionRequest, Html2PdfError> {
        BackendOptions::default().merged(&self.request.overrides)?;
        Ok(self.request)
    }
}

/// The input path with its extension replaced by `pdf`
/// (`poster.html` → `poster.pdf`, `report.htm` → `report.pdf`).
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}
