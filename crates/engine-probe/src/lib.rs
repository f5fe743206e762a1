//! # engine-probe
//!
//! Locate the external engines that `edgequake-html2pdf` delegates to
//! (Chrome/Chromium, WeasyPrint and wkhtmltopdf) without launching them.
//!
//! ## How it works
//!
//! [`locate`] resolves an [`Engine`] to an executable path, first match wins:
//!
//! 1. An explicit path supplied by the caller ([`locate_with`]).
//! 2. The engine's environment variable (e.g. `HTML2PDF_WKHTMLTOPDF`).
//! 3. Every directory of `PATH`, trying each known executable name.
//! 4. Platform-specific install locations (`/Applications/…`,
//!    `C:\Program Files\…`, `~/.local/bin`, Homebrew prefixes).
//!
//! Nothing is cached: a probe is a handful of `stat` calls and engines may be
//! installed between two runs of the same process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use engine_probe::{locate, WKHTMLTOPDF};
//!
//! match locate(&WKHTMLTOPDF) {
//!     Ok(path) => println!("wkhtmltopdf at {}", path.display()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! ## Environment variable overrides
//!
//! | Engine      | Variable               |
//! |-------------|------------------------|
//! | Chrome      | `HTML2PDF_CHROME`      |
//! | WeasyPrint  | `HTML2PDF_WEASYPRINT`  |
//! | wkhtmltopdf | `HTML2PDF_WKHTMLTOPDF` |

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Engine catalogue ─────────────────────────────────────────────────────────

/// Static description of an external engine executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    /// Human-readable engine name used in diagnostics.
    pub name: &'static str,
    /// Environment variable holding an explicit executable path.
    pub env_var: &'static str,
    /// Executable names searched on `PATH`, most specific first.
    pub executables: &'static [&'static str],
    /// Installation hint shown when the engine cannot be found.
    pub hint: &'static str,
}

/// Google Chrome or Chromium, used by both browser backends.
pub const CHROME: Engine = Engine {
    name: "Chrome/Chromium",
    env_var: "HTML2PDF_CHROME",
    executables: &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
    ],
    hint: "Install Google Chrome or Chromium, or set HTML2PDF_CHROME=/path/to/chrome",
};

/// The WeasyPrint command-line renderer.
pub const WEASYPRINT: Engine = Engine {
    name: "WeasyPrint",
    env_var: "HTML2PDF_WEASYPRINT",
    executables: &["weasyprint"],
    hint: "Install with: pip install weasyprint (or set HTML2PDF_WEASYPRINT)",
};

/// The wkhtmltopdf renderer.
pub const WKHTMLTOPDF: Engine = Engine {
    name: "wkhtmltopdf",
    env_var: "HTML2PDF_WKHTMLTOPDF",
    executables: &["wkhtmltopdf"],
    hint: "Download from https://wkhtmltopdf.org/downloads.html (or set HTML2PDF_WKHTMLTOPDF)",
};

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by engine-probe lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// No executable was found anywhere on the search path.
    #[error("{engine} not found\n{hint}")]
    NotFound { engine: String, hint: String },

    /// The engine's environment variable points at a missing file.
    #[error("{var} is set to '{path}', but that file does not exist")]
    EnvPathInvalid { var: String, path: PathBuf },

    /// A supplied path does not name an executable file.
    #[error("'{path}' is missing or not an executable file")]
    NotExecutable { path: PathBuf },
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve `engine` using the environment variable, `PATH` and the platform's
/// well-known install locations.
pub fn locate(engine: &Engine) -> Result<PathBuf, ProbeError> {
    locate_with(engine, None)
}

/// Like [`locate`], but an `explicit` path (from configuration) takes
/// precedence over everything else.
pub fn locate_with(engine: &Engine, explicit: Option<&Path>) -> Result<PathBuf, ProbeError> {
    resolve(
        engine,
        explicit,
        std::env::var_os(engine.env_var),
        std::env::var_os("PATH"),
    )
}

/// Returns `true` when [`locate`] would succeed.
pub fn is_available(engine: &Engine) -> bool {
    locate(engine).is_ok()
}

/// Search every directory of `path_var` (a `PATH`-formatted string) for the
/// first of `names` that is an executable file.
pub fn find_on_path(names: &[&str], path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| {
            names
                .iter()
                .map(move |name| dir.join(executable_file_name(name)))
        })
        .find(|candidate| is_executable(candidate))
}

/// Platform-specific locations checked after `PATH`.
pub fn well_known_locations(engine: &Engine) -> Vec<PathBuf> {
    let mut dirs_to_scan: Vec<PathBuf> = Vec::new();
    if let Some(d) = dirs::executable_dir() {
        dirs_to_scan.push(d);
    }
    if let Some(home) = dirs::home_dir() {
        dirs_to_scan.push(home.join(".local").join("bin"));
    }

    let mut out: Vec<PathBuf> = Vec::new();

    match std::env::consts::OS {
        "macos" => {
            if engine.env_var == CHROME.env_var {
                out.push(PathBuf::from(
                    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
                ));
                out.push(PathBuf::from(
                    "/Applications/Chromium.app/Contents/MacOS/Chromium",
                ));
            }
            dirs_to_scan.push(PathBuf::from("/opt/homebrew/bin"));
            dirs_to_scan.push(PathBuf::from("/usr/local/bin"));
        }
        "windows" => {
            let program_files = [
                std::env::var_os("ProgramFiles"),
                std::env::var_os("ProgramFiles(x86)"),
                std::env::var_os("LOCALAPPDATA"),
            ];
            for base in program_files.into_iter().flatten().map(PathBuf::from) {
                if engine.env_var == CHROME.env_var {
                    out.push(base.join(r"Google\Chrome\Application\chrome.exe"));
                    out.push(base.join(r"Chromium\Application\chrome.exe"));
                } else if engine.env_var == WKHTMLTOPDF.env_var {
                    out.push(base.join(r"wkhtmltopdf\bin\wkhtmltopdf.exe"));
                }
            }
        }
        _ => {
            dirs_to_scan.push(PathBuf::from("/usr/local/bin"));
            dirs_to_scan.push(PathBuf::from("/snap/bin"));
        }
    }

    for dir in dirs_to_scan {
        for name in engine.executables {
            out.push(dir.join(executable_file_name(name)));
        }
    }

    out.dedup();
    out
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn resolve(
    engine: &Engine,
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    path_var: Option<OsString>,
) -> Result<PathBuf, ProbeError> {
    // 1. Caller-supplied path.
    if let Some(p) = explicit {
        return check_executable(p);
    }

    // 2. Environment variable override.
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let p = PathBuf::from(value);
        if !p.exists() {
            return Err(ProbeError::EnvPathInvalid {
                var: engine.env_var.to_string(),
                path: p,
            });
        }
        return check_executable(&p);
    }

    // 3. PATH.
    if let Some(found) = path_var.and_then(|pv| find_on_path(engine.executables, &pv)) {
        return Ok(found);
    }

    // 4. Well-known install locations.
    well_known_locations(engine)
        .into_iter()
        .find(|p| is_executable(p))
        .ok_or_else(|| ProbeError::NotFound {
            engine: engine.name.to_string(),
            hint: engine.hint.to_string(),
        })
}

fn check_executable(path: &Path) -> Result<PathBuf, ProbeError> {
    if is_executable(path) {
        Ok(path.to_path_buf())
    } else {
        Err(ProbeError::NotExecutable {
            path: path.to_path_buf(),
        })
    }
}

fn executable_file_name(name: &str) -> PathBuf {
    let suffix = std::env::consts::EXE_SUFFIX;
    if suffix.is_empty() || Path::new(name).extension().is_some() {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}{suffix}"))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
