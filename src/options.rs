//! The Option Bag: validated, per-node redirection and execution options.
//!
//! Rust's static dispatch already closes the key set spec.md asks for (there
//! is simply no method for an unrecognised key), and the sealed
//! `InputRedirection`/`OutputRedirection` traits below — lifted directly from
//! the teacher's `exec.rs` — close the set of *types* accepted for each key.
//! The two genuinely dynamic invariants, `env`/`full_env` and `input`/`stdin`
//! mutual exclusion, are still checked eagerly in the setters, panicking the
//! same way the teacher panics on `Redirection::Merge` for stdin.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Redirection target for standard output or standard error.
#[derive(Debug, Default)]
pub enum OutRedirection {
    /// Inherit the stream from the parent context (the default).
    #[default]
    Inherit,
    /// Send the stream to the null device.
    Null,
    /// Open the given path for writing (truncating it).
    Path(PathBuf),
    /// Use the given already-open file.
    File(File),
    /// Capture the stream, decoding it as UTF-8 text on materialisation.
    CaptureText,
    /// Capture the stream, leaving it as raw bytes on materialisation.
    CaptureBytes,
    /// Mirror whatever standard output ends up targeting (only valid for `stderr`).
    MirrorStdout,
    /// Mirror whatever standard error ends up targeting (only valid for `stdout`).
    MirrorStderr,
}

/// Source for standard input, set via [`crate::Expression::stdin`].
#[derive(Debug, Default)]
pub enum StdinSource {
    /// Inherit stdin from the parent context (the default).
    #[default]
    Inherit,
    /// Read from the null device.
    Null,
    /// Open the given path for reading.
    Path(PathBuf),
    /// Read from the given already-open file.
    File(File),
    /// Feed the given bytes on stdin, via an internal pipe and writer thread.
    Input(Vec<u8>),
}

/// The sentinel used for `stdin`/`stdout`/`stderr` to request the null device.
pub const DEVNULL: Sentinel = Sentinel::Devnull;
/// The sentinel used for `stdout` to request stdout mirror standard error's target,
/// or for `stderr` to request standard error mirror standard output's target.
pub const STDOUT: Sentinel = Sentinel::Stdout;
/// The sentinel used for `stderr` to request standard error mirror standard output's
/// target, or for `stdout` to request stdout mirror standard error's target.
pub const STDERR: Sentinel = Sentinel::Stderr;

/// A distinguished singleton value accepted by the `stdin`/`stdout`/`stderr` setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// The null device (`/dev/null` on Unix).
    Devnull,
    /// Refers to whatever standard output is (or will be) redirected to.
    Stdout,
    /// Refers to whatever standard error is (or will be) redirected to.
    Stderr,
}

/// Marker type requesting UTF-8 text capture, used as `.stdout(Text)`.
///
/// This is the Rust rendering of spec.md's "type tags act as sentinels":
/// passing the *type itself*, dispatched through [`OutputRedirection`].
#[derive(Debug, Clone, Copy)]
pub struct Text;

/// Marker type requesting raw byte capture, used as `.stdout(Bytes)`.
#[derive(Debug, Clone, Copy)]
pub struct Bytes;

mod sealed {
    pub trait InputSealed {}
    pub trait OutputSealed {}
}

/// Types that can be passed to [`crate::Expression::stdin`].
#[allow(private_interfaces)]
pub trait InputRedirection: sealed::InputSealed {
    #[doc(hidden)]
    fn into_stdin_source(self) -> StdinSource;
}

/// Types that can be passed to [`crate::Expression::stdout`]/[`crate::Expression::stderr`].
#[allow(private_interfaces)]
pub trait OutputRedirection: sealed::OutputSealed {
    #[doc(hidden)]
    fn into_out_redirection(self) -> OutRedirection;
}

impl sealed::InputSealed for Sentinel {}
impl InputRedirection for Sentinel {
    fn into_stdin_source(self) -> StdinSource {
        match self {
            Sentinel::Devnull => StdinSource::Null,
            Sentinel::Stdout | Sentinel::Stderr => {
                panic!("STDOUT/STDERR are only valid for stdout/stderr, not stdin")
            }
        }
    }
}

impl sealed::InputSealed for PathBuf {}
impl InputRedirection for PathBuf {
    fn into_stdin_source(self) -> StdinSource {
        StdinSource::Path(self)
    }
}

impl sealed::InputSealed for &Path {}
impl InputRedirection for &Path {
    fn into_stdin_source(self) -> StdinSource {
        StdinSource::Path(self.to_owned())
    }
}

impl sealed::InputSealed for File {}
impl InputRedirection for File {
    fn into_stdin_source(self) -> StdinSource {
        StdinSource::File(self)
    }
}

impl sealed::OutputSealed for Sentinel {}
impl OutputRedirection for Sentinel {
    fn into_out_redirection(self) -> OutRedirection {
        match self {
            Sentinel::Devnull => OutRedirection::Null,
            Sentinel::Stdout => OutRedirection::MirrorStdout,
            Sentinel::Stderr => OutRedirection::MirrorStderr,
        }
    }
}

impl sealed::OutputSealed for PathBuf {}
impl OutputRedirection for PathBuf {
    fn into_out_redirection(self) -> OutRedirection {
        OutRedirection::Path(self)
    }
}

impl sealed::OutputSealed for &Path {}
impl OutputRedirection for &Path {
    fn into_out_redirection(self) -> OutRedirection {
        OutRedirection::Path(self.to_owned())
    }
}

impl sealed::OutputSealed for File {}
impl OutputRedirection for File {
    fn into_out_redirection(self) -> OutRedirection {
        OutRedirection::File(self)
    }
}

impl sealed::OutputSealed for Text {}
impl OutputRedirection for Text {
    fn into_out_redirection(self) -> OutRedirection {
        OutRedirection::CaptureText
    }
}

impl sealed::OutputSealed for Bytes {}
impl OutputRedirection for Bytes {
    fn into_out_redirection(self) -> OutRedirection {
        OutRedirection::CaptureBytes
    }
}

/// How the child's environment is derived from the parent's.
#[derive(Debug, Default)]
pub(crate) enum EnvMode {
    /// Inherit the parent's environment unmodified (the default).
    #[default]
    Inherit,
    /// Inherit the parent's environment, merging in the given pairs.
    Merge(Vec<(OsString, OsString)>),
    /// Replace the environment entirely with the given pairs.
    Full(Vec<(OsString, OsString)>),
}

/// The validated option bag attached to one [`crate::Expression`] node.
///
/// Every setter is eager: invalid combinations (`env` + `full_env`, `input` +
/// `stdin`) panic immediately rather than waiting for a run to be attempted,
/// matching spec.md's "fails at construction time".
#[derive(Debug, Default)]
pub struct Options {
    pub(crate) cwd: Option<PathBuf>,
    pub(crate) env_mode: EnvMode,
    pub(crate) stdin: StdinSource,
    pub(crate) stdin_is_input: bool,
    pub(crate) stdout: OutRedirection,
    pub(crate) stderr: OutRedirection,
    pub(crate) check: Option<bool>,
    pub(crate) trim: Option<bool>,
    #[cfg(unix)]
    pub(crate) setuid: Option<u32>,
    #[cfg(unix)]
    pub(crate) setgid: Option<u32>,
    #[cfg(unix)]
    pub(crate) setpgid: bool,
}

impl Options {
    pub(crate) fn new() -> Options {
        Options::default()
    }

    pub(crate) fn cwd(&mut self, dir: impl AsRef<Path>) {
        self.cwd = Some(dir.as_ref().to_owned());
    }

    pub(crate) fn env(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) {
        match &mut self.env_mode {
            EnvMode::Full(_) => panic!("env() cannot be combined with full_env()"),
            EnvMode::Inherit => {
                self.env_mode = EnvMode::Merge(vec![(
                    key.as_ref().to_owned(),
                    value.as_ref().to_owned(),
                )]);
            }
            EnvMode::Merge(pairs) => pairs.push((key.as_ref().to_owned(), value.as_ref().to_owned())),
        }
    }

    pub(crate) fn full_env(
        &mut self,
        vars: impl IntoIterator<Item = (impl AsRef<OsStr>, impl AsRef<OsStr>)>,
    ) {
        if matches!(self.env_mode, EnvMode::Merge(_)) {
            panic!("full_env() cannot be combined with env()");
        }
        let pairs = vars
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned()))
            .collect();
        self.env_mode = EnvMode::Full(pairs);
    }

    pub(crate) fn input(&mut self, data: impl Into<Vec<u8>>) {
        if matches!(self.stdin, StdinSource::Inherit) || self.stdin_is_input {
            self.stdin = StdinSource::Input(data.into());
            self.stdin_is_input = true;
        } else {
            panic!("input() cannot be combined with stdin()");
        }
    }

    pub(crate) fn stdin(&mut self, source: impl InputRedirection) {
        if self.stdin_is_input {
            panic!("stdin() cannot be combined with input()");
        }
        self.stdin = source.into_stdin_source();
    }

    pub(crate) fn stdout(&mut self, out: impl OutputRedirection) {
        self.stdout = out.into_out_redirection();
    }

    pub(crate) fn stderr(&mut self, out: impl OutputRedirection) {
        self.stderr = out.into_out_redirection();
    }

    pub(crate) fn check(&mut self, value: bool) {
        self.check = Some(value);
    }

    pub(crate) fn trim(&mut self, value: bool) {
        self.trim = Some(value);
    }

    /// Resolves the effective `check` flag, defaulting to `true`.
    pub(crate) fn effective_check(&self) -> bool {
        self.check.unwrap_or(true)
    }

    /// Resolves the effective `trim` flag, defaulting to `true`.
    pub(crate) fn effective_trim(&self) -> bool {
        self.trim.unwrap_or(true)
    }

    #[cfg(unix)]
    pub(crate) fn setuid(&mut self, uid: u32) {
        self.setuid = Some(uid);
    }

    #[cfg(unix)]
    pub(crate) fn setgid(&mut self, gid: u32) {
        self.setgid = Some(gid);
    }

    #[cfg(unix)]
    pub(crate) fn setpgid(&mut self) {
        self.setpgid = true;
    }
}
