//! CLI binary for edgequake-html2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `Converter` + `ConversionRequest` and reports the outcome through the
//! exit code: 0 when a PDF was written, 1 on any failure.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_html2pdf::{
    BackendError, BackendKind, BackendOptions, BackendOverrides, ConversionProgressCallback,
    ConversionRequest, Converter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the backend being tried,
/// plus one log line per finished attempt.
struct CliProgressCallback {
    /// Created on the first event, so a run that fails its checks before
    /// converting never starts the spinner.
    bar: OnceLock<ProgressBar>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: OnceLock::new(),
        })
    }

    fn spinner() -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn bar(&self) -> &ProgressBar {
        self.bar.get_or_init(Self::spinner)
    }

    #[cfg(test)]
    fn is_started(&self) -> bool {
        self.bar.get().is_some()
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, input: &Path, output: &Path) {
        self.bar().println(format!(
            "{} {} {} {}",
            cyan("◆"),
            bold(&input.display().to_string()),
            dim("→"),
            output.display()
        ));
    }

    fn on_attempt_start(&self, backend: BackendKind, attempt: usize, total: usize) {
        let bar = self.bar();
        bar.set_prefix("Converting");
        bar.reset_elapsed();
        bar.set_message(format!("trying {backend} ({attempt}/{total})"));
    }

    fn on_attempt_success(&self, backend: BackendKind, _output: &Path, elapsed_ms: u64) {
        self.bar().println(format!(
            "  {} {:<16} {}",
            green("✓"),
            backend.name(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_attempt_failure(&self, backend: BackendKind, error: &BackendError, elapsed_ms: u64) {
        self.bar().println(format!(
            "  {} {:<16} {}  {}",
            red("✗"),
            backend.name(),
            red(&first_line(&error.to_string(), 80)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_conversion_complete(&self, _success: bool, _attempts: usize) {
        if let Some(bar) = self.bar.get() {
            bar.finish_and_clear();
        }
    }
}

/// First line of `s`, truncated to `max` characters.
fn first_line(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        line.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with the first backend that works (writes poster.pdf)
  html2pdf poster.html

  # Choose the output path
  html2pdf poster.html -o out/high_quality.pdf

  # Force one backend (legacy names selenium / playwright / pdfkit also work)
  html2pdf -m weasyprint poster.html

  # Try only the executable-driven engines, wkhtmltopdf first
  html2pdf --order wkhtmltopdf,weasyprint poster.html

  # Tweak print options per backend
  html2pdf --options print.json poster.html

  # What is installed?
  html2pdf --list-backends

BACKENDS (auto order):
  Name             Aliases           Needs
  ───────────────  ────────────────  ─────────────────────────────
  headless-chrome  chrome, selenium  Chrome or Chromium
  chromium         playwright        Chrome or Chromium
  weasyprint                         pip install weasyprint
  wkhtmltopdf      wkhtml, pdfkit    wkhtmltopdf 0.12.6

OPTIONS FILE (JSON, every key optional):
  {
    "headless_chrome": { "settle_ms": 500, "print": { "landscape": true } },
    "chromium":        { "print": { "scale": 0.9 } },
    "weasyprint":      { "page_size": "letter", "jpeg_quality": 85 },
    "wkhtmltopdf":     { "dpi": 150, "javascript_delay_ms": 0 }
  }

ENVIRONMENT VARIABLES:
  HTML2PDF_METHOD       Default for --method
  HTML2PDF_OPTIONS      Default for --options
  HTML2PDF_CHROME       Chrome / Chromium executable
  HTML2PDF_WEASYPRINT   weasyprint executable
  HTML2PDF_WKHTMLTOPDF  wkhtmltopdf executable
  RUST_LOG              Log filter (overrides -v / -q)

EXIT STATUS:
  0  the PDF was written
  1  anything else (bad arguments, missing input, every backend failed)
"#;

/// Convert HTML documents to print-quality PDF.
#[derive(Parser, Debug)]
#[command(
    name = "html2pdf",
    version,
    about = "Convert HTML documents to print-quality PDF",
    long_about = "Convert an HTML document to PDF through headless Chrome, Chromium (CDP), \
WeasyPrint or wkhtmltopdf. In auto mode every backend is tried in priority order \
until one produces the PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input HTML file.
    #[arg(required_unless_present = "list_backends")]
    input: Option<PathBuf>,

    /// Output PDF path. Default: the input path with a .pdf extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Conversion method: auto, headless-chrome, chromium, weasyprint, wkhtmltopdf.
    #[arg(
        short,
        long,
        env = "HTML2PDF_METHOD",
        default_value = "auto",
        long_help = "Conversion method. `auto` tries every backend in priority order and keeps \
          the first PDF produced.\n\
          Backends: headless-chrome (alias chrome, selenium), chromium (alias playwright), \
          weasyprint, wkhtmltopdf (alias wkhtml, pdfkit)."
    )]
    method: String,

    /// JSON file with per-backend option overrides.
    #[arg(long, env = "HTML2PDF_OPTIONS")]
    options: Option<PathBuf>,

    /// Auto-mode priority order, comma separated.
    #[arg(long, value_delimiter = ',')]
    order: Vec<String>,

    /// Show which backends are usable on this machine and exit.
    #[arg(long)]
    list_backends: bool,

    /// Print the conversion report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too, and are not failures.
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // per-attempt lines carry the same information.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_backends;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", red("❌"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, show_progress: bool) -> Result<()> {
    let converter = build_converter(&cli, show_progress)?;

    // ── List-backends mode ───────────────────────────────────────────────
    if cli.list_backends {
        return print_backends(&converter, cli.json);
    }

    // ── Build request ────────────────────────────────────────────────────
    let input = cli
        .input
        .clone()
        .context("An input HTML file is required")?;
    let mut builder = ConversionRequest::builder(input).method(cli.method.as_str());
    if let Some(ref output) = cli.output {
        builder = builder.output(output);
    }
    let request = builder.build().context("Invalid request")?;

    // ── Run conversion ───────────────────────────────────────────────────
    let report = converter.convert(&request).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        let skipped = report.failed_attempts().count();
        eprintln!(
            "{}  PDF created with {}  {}ms  →  {}",
            green("✔"),
            bold(report.backend.name()),
            report.total_duration_ms,
            bold(&report.output.display().to_string()),
        );
        if skipped > 0 && !show_progress {
            eprintln!(
                "   {}",
                dim(&format!("{skipped} backend(s) failed before this one"))
            );
        }
    }

    Ok(())
}

/// Map CLI args to a `Converter`.
fn build_converter(cli: &Cli, show_progress: bool) -> Result<Converter> {
    // Options-file overrides become the converter's defaults, so
    // --list-backends sees the same `binary` paths a conversion would.
    let defaults = match cli.options {
        Some(ref path) => {
            let overrides = BackendOverrides::from_json_file(path)?;
            BackendOptions::default()
                .merged(&overrides)
                .with_context(|| format!("Invalid options in {}", path.display()))?
        }
        None => BackendOptions::default(),
    };

    let mut builder = Converter::builder().defaults(defaults);

    if !cli.order.is_empty() {
        let order = cli
            .order
            .iter()
            .map(|name| name.parse::<BackendKind>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Invalid --order")?;
        builder = builder.priority(order);
    }

    if show_progress {
        builder = builder.progress_callback(CliProgressCallback::new());
    }

    builder.build().context("Invalid configuration")
}

/// Print each backend's availability, in auto order.
fn print_backends(converter: &Converter, json: bool) -> Result<()> {
    let mut statuses = converter.available();
    let rank = |k: &BackendKind| {
        converter
            .priority()
            .iter()
            .position(|p| p == k)
            .unwrap_or(usize::MAX)
    };
    statuses.sort_by_key(|(k, _)| rank(k));

    if json {
        let entries: Vec<serde_json::Value> = statuses
            .iter()
            .map(|(kind, status)| {
                serde_json::json!({
                    "backend": kind,
                    "aliases": kind.aliases(),
                    "available": status.is_ok(),
                    "in_auto_order": converter.priority().contains(kind),
                    "detail": status.as_ref().err().map(|e| e.to_string()),
                })
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialise backends")?;
        println!("{json}");
        return Ok(());
    }

    for (kind, status) in &statuses {
        let aliases = if kind.aliases().is_empty() {
            String::new()
        } else {
            dim(&format!("(alias {})", kind.aliases().join(", ")))
        };
        match status {
            Ok(()) => println!("  {} {:<16} {}", green("✓"), kind.name(), aliases),
            Err(e) => {
                println!("  {} {:<16} {}", red("✗"), kind.name(), aliases);
                for line in e.to_string().lines().skip(1) {
                    println!("      {}", dim(line.trim()));
                }
            }
        }
    }
    let order: Vec<&str> = converter.priority().iter().map(|k| k.name()).collect();
    println!("\nAuto order: {}", order.join(" → "));
    Ok(())
}
