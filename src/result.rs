//! Result Aggregation: the materialised outcome of a run.
//!
//! Grounded on the teacher's `Capture` (in `exec.rs`/`job.rs`), which pairs an
//! `ExitStatus` with `Vec<u8>` buffers for stdout/stderr and offers
//! `stdout_str`/`stderr_str` lossy-UTF-8 accessors. `RunResult` is the same
//! shape, narrowed to spec.md §4.6's `{status, stdout, stderr}` triple: a
//! stream is `None` unless the expression explicitly requested a capture.

use std::borrow::Cow;

use crate::process::ExitStatus;

/// What ended up in one captured standard stream.
#[derive(Debug, Clone, Default)]
pub(crate) enum Captured {
    /// The stream was not captured.
    #[default]
    None,
    /// The stream was captured; these are the raw bytes written to it.
    Bytes(Vec<u8>),
}

impl Captured {
    pub(crate) fn from_option(bytes: Option<Vec<u8>>) -> Captured {
        match bytes {
            Some(bytes) => Captured::Bytes(bytes),
            None => Captured::None,
        }
    }

    pub(crate) fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Captured::None => None,
            Captured::Bytes(bytes) => Some(bytes),
        }
    }
}

/// The outcome of [`crate::Expression::run`]: the aggregate exit status of the
/// whole tree, plus whatever standard streams were captured at the root.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The aggregate exit status, per the walk rules of each composition
    /// operator (spec.md §4.5).
    pub status: ExitStatus,
    pub(crate) stdout: Captured,
    pub(crate) stderr: Captured,
}

impl RunResult {
    pub(crate) fn new(status: ExitStatus, stdout: Captured, stderr: Captured) -> RunResult {
        RunResult {
            status,
            stdout,
            stderr,
        }
    }

    /// `true` if the aggregate status is a successful (zero) exit.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// The raw bytes captured from stdout, if stdout was redirected to a
    /// capture (`.stdout(Text)` or `.stdout(Bytes)`).
    pub fn stdout_bytes(&self) -> Option<&[u8]> {
        self.stdout.as_bytes()
    }

    /// The raw bytes captured from stderr, if stderr was redirected to a
    /// capture (`.stderr(Text)` or `.stderr(Bytes)`).
    pub fn stderr_bytes(&self) -> Option<&[u8]> {
        self.stderr.as_bytes()
    }

    /// Captured stdout, lossily decoded as UTF-8, if stdout was captured.
    pub fn stdout_str(&self) -> Option<Cow<'_, str>> {
        self.stdout_bytes().map(String::from_utf8_lossy)
    }

    /// Captured stderr, lossily decoded as UTF-8, if stderr was captured.
    pub fn stderr_str(&self) -> Option<Cow<'_, str>> {
        self.stderr_bytes().map(String::from_utf8_lossy)
    }
}
