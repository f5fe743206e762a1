//! Running an engine executable as a child process.
//!
//! `kill_on_drop` guarantees the child is reaped if the future driving it is
//! dropped, so an abandoned attempt never leaves an engine running.

use super::BackendKind;
use crate::error::BackendError;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 600;

/// Run `program` with `args` to completion; a non-zero exit becomes
/// [`BackendError::ConversionFailed`] carrying the tail of stderr.
pub(crate) async fn run_engine(
    backend: BackendKind,
    program: &Path,
    args: &[OsString],
) -> Result<(), BackendError> {
    debug!(
        "{backend}: running {} {}",
        program.display(),
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            BackendError::failed(
                backend,
                format!("failed to start '{}': {e}", program.display()),
            )
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let excerpt = tail(stderr.trim(), STDERR_EXCERPT);
    let status = match output.status.code() {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    };
    Err(BackendError::failed(
        backend,
        if excerpt.is_empty() {
            status
        } else {
            format!("{status}: {excerpt}")
        },
    ))
}

/// The last `max` bytes of `s`, cut on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
