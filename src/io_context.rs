//! The I/O Context: materialises an [`Options`] bag into real descriptors.
//!
//! Grounded on the teacher's `spawn.rs` `setup_streams`, which resolves the
//! same Merge/swap semantics this crate needs — but where the teacher dups
//! fds at fork time via raw `libc`, this crate launches children through
//! `std::process::Command`, so resolution happens up front into plain
//! `std::fs::File`s that are cloned (`File::try_clone`, a `dup()` under the
//! hood) once per leaf that needs them.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::process::Stdio;

use log::trace;

use crate::error::{Error, Result as CrateResult};
use crate::options::{OutRedirection, Options, StdinSource};
use crate::worker::ThreadWithReturn;

/// An optional owned file standing in for one of the three standard streams.
/// `None` means "inherit the real OS stream", exactly as handed down from
/// parent to child when nothing overrides it.
pub(crate) type Descriptor = Option<File>;

fn clone_descriptor(d: &Descriptor) -> io::Result<Descriptor> {
    d.as_ref().map(File::try_clone).transpose()
}

#[cfg(unix)]
fn null_device(write: bool) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(!write).write(write);
    opts.open("/dev/null")
}

#[cfg(windows)]
fn null_device(write: bool) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(!write).write(write);
    opts.open("nul")
}

#[cfg(unix)]
fn dup_real_stream(fd: i32) -> io::Result<File> {
    use std::os::unix::io::{FromRawFd, IntoRawFd};
    // Not using std::io::stdout()/stderr() here because they are line-buffered
    // wrappers; dup()-ing the raw fd gives a stream equivalent to the real
    // descriptor, which is what a cross-stream reference needs to duplicate.
    let owned = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) }.try_clone_to_owned()?;
    Ok(unsafe { File::from_raw_fd(owned.into_raw_fd()) })
}

#[cfg(windows)]
fn dup_real_stream(std_handle: winapi::shared::minwindef::DWORD) -> io::Result<File> {
    use std::os::windows::io::{BorrowedHandle, FromRawHandle, IntoRawHandle};
    use winapi::um::processenv::GetStdHandle;
    let handle = unsafe { GetStdHandle(std_handle) };
    let owned = unsafe { BorrowedHandle::borrow_raw(handle as _) }.try_clone_to_owned()?;
    Ok(unsafe { File::from_raw_handle(owned.into_raw_handle()) })
}

#[cfg(unix)]
fn real_stdout() -> io::Result<File> {
    dup_real_stream(1)
}
#[cfg(unix)]
fn real_stderr() -> io::Result<File> {
    dup_real_stream(2)
}
#[cfg(windows)]
fn real_stdout() -> io::Result<File> {
    dup_real_stream(winapi::um::winbase::STD_OUTPUT_HANDLE)
}
#[cfg(windows)]
fn real_stderr() -> io::Result<File> {
    dup_real_stream(winapi::um::winbase::STD_ERROR_HANDLE)
}

#[cfg(unix)]
fn reader_into_file(r: os_pipe::PipeReader) -> File {
    use std::os::unix::io::{FromRawFd, IntoRawFd};
    unsafe { File::from_raw_fd(r.into_raw_fd()) }
}
#[cfg(windows)]
fn reader_into_file(r: os_pipe::PipeReader) -> File {
    use std::os::windows::io::{FromRawHandle, IntoRawHandle};
    unsafe { File::from_raw_handle(r.into_raw_handle()) }
}
#[cfg(unix)]
fn writer_into_file(w: os_pipe::PipeWriter) -> File {
    use std::os::unix::io::{FromRawFd, IntoRawFd};
    unsafe { File::from_raw_fd(w.into_raw_fd()) }
}
#[cfg(windows)]
fn writer_into_file(w: os_pipe::PipeWriter) -> File {
    use std::os::windows::io::{FromRawHandle, IntoRawHandle};
    unsafe { File::from_raw_handle(w.into_raw_handle()) }
}

/// State of one captured stream.
pub(crate) enum CaptureSlot {
    /// The stream was not captured.
    None,
    /// Capture is in progress on a background reader thread.
    Pending(ThreadWithReturn<io::Result<Vec<u8>>>),
    /// Capture has completed; the bytes are available.
    Ready(Vec<u8>),
}

impl Default for CaptureSlot {
    fn default() -> CaptureSlot {
        CaptureSlot::None
    }
}

impl CaptureSlot {
    pub(crate) fn finish(self) -> io::Result<CaptureSlot> {
        match self {
            CaptureSlot::Pending(handle) => Ok(CaptureSlot::Ready(handle.join()?)),
            other => Ok(other),
        }
    }

    /// Returns the captured bytes, or a state error if teardown hasn't
    /// happened yet (spec.md's "results not ready").
    pub(crate) fn bytes(&self) -> CrateResult<Option<&[u8]>> {
        match self {
            CaptureSlot::None => Ok(None),
            CaptureSlot::Ready(bytes) => Ok(Some(bytes)),
            CaptureSlot::Pending(_) => Err(Error::State(
                "captured output accessed before the I/O context was torn down",
            )),
        }
    }

    /// Consumes a slot that has already passed through [`finish`](Self::finish),
    /// returning its bytes. Only ever called on a [`TornDown`] value, so the
    /// `Pending` arm is unreachable.
    pub(crate) fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            CaptureSlot::None => None,
            CaptureSlot::Ready(bytes) => Some(bytes),
            CaptureSlot::Pending(_) => unreachable!("finish() always resolves pending captures"),
        }
    }
}

fn make_capture_pipe(slot: &mut CaptureSlot) -> io::Result<File> {
    let (reader, writer) = os_pipe::pipe()?;
    let mut reader_file = reader_into_file(reader);
    let handle = ThreadWithReturn::start(move || -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        reader_file.read_to_end(&mut buf)?;
        Ok(buf)
    });
    *slot = CaptureSlot::Pending(handle);
    Ok(writer_into_file(writer))
}

/// Creates an anonymous pipe as a plain `(read_end, write_end)` pair of
/// `File`s, for [`crate::engine`]'s `Pipe` node to wire a producer's stdout
/// to a consumer's stdin.
pub(crate) fn pipe_files() -> io::Result<(File, File)> {
    let (reader, writer) = os_pipe::pipe()?;
    Ok((reader_into_file(reader), writer_into_file(writer)))
}

#[derive(Clone, Copy)]
enum CrossTarget {
    Stdout,
    Stderr,
}

fn cross_target(redir: &OutRedirection) -> Option<CrossTarget> {
    match redir {
        OutRedirection::MirrorStdout => Some(CrossTarget::Stdout),
        OutRedirection::MirrorStderr => Some(CrossTarget::Stderr),
        _ => None,
    }
}

/// Resolves a non-cross-reference `OutRedirection` to a concrete descriptor.
/// Panics on a `Mirror*` variant: callers only invoke this after filtering
/// those out via [`cross_target`].
fn resolve_plain_output(redir: OutRedirection, parent: &Descriptor, slot: &mut CaptureSlot) -> io::Result<Descriptor> {
    match redir {
        OutRedirection::Inherit => clone_descriptor(parent),
        OutRedirection::Null => Ok(Some(null_device(true)?)),
        OutRedirection::Path(path) => Ok(Some(File::create(path)?)),
        OutRedirection::File(file) => Ok(Some(file)),
        OutRedirection::CaptureText | OutRedirection::CaptureBytes => Ok(Some(make_capture_pipe(slot)?)),
        OutRedirection::MirrorStdout | OutRedirection::MirrorStderr => {
            unreachable!("cross-reference sentinels are resolved separately")
        }
    }
}

/// The run-time binding of the three standard descriptors for one expression
/// sub-tree, plus its owned background reader/writer threads.
pub(crate) struct IoContext {
    pub(crate) stdin: Descriptor,
    pub(crate) stdout: Descriptor,
    pub(crate) stderr: Descriptor,
    stdin_writer: Option<ThreadWithReturn<io::Result<()>>>,
    stdout_capture: CaptureSlot,
    stderr_capture: CaptureSlot,
}

/// What remains of an [`IoContext`] after [`IoContext::finish`]: the
/// captured output, ready to read.
pub(crate) struct TornDown {
    pub(crate) stdout: CaptureSlot,
    pub(crate) stderr: CaptureSlot,
}

impl IoContext {
    /// The context at the root of a run: every stream inherited from this
    /// process's own standard streams.
    pub(crate) fn root() -> IoContext {
        IoContext {
            stdin: None,
            stdout: None,
            stderr: None,
            stdin_writer: None,
            stdout_capture: CaptureSlot::None,
            stderr_capture: CaptureSlot::None,
        }
    }

    /// Derives a child context from `self` and a validated option bag,
    /// implementing spec.md's three derivation rules including the
    /// pre-redirection stdout/stderr swap.
    pub(crate) fn derive(&self, opts: &mut Options) -> io::Result<IoContext> {
        trace!("deriving I/O context from options");

        let stdin_redir = std::mem::take(&mut opts.stdin);
        let (stdin, stdin_writer) = resolve_stdin(stdin_redir, &self.stdin)?;

        let stdout_redir = std::mem::replace(&mut opts.stdout, OutRedirection::Inherit);
        let stderr_redir = std::mem::replace(&mut opts.stderr, OutRedirection::Inherit);

        let stdout_cross = cross_target(&stdout_redir);
        let stderr_cross = cross_target(&stderr_redir);

        let mut stdout_capture = CaptureSlot::None;
        let mut stderr_capture = CaptureSlot::None;

        let stdout_explicit = if stdout_cross.is_none() {
            Some(resolve_plain_output(stdout_redir, &self.stdout, &mut stdout_capture)?)
        } else {
            None
        };
        let stderr_explicit = if stderr_cross.is_none() {
            Some(resolve_plain_output(stderr_redir, &self.stderr, &mut stderr_capture)?)
        } else {
            None
        };

        let stdout = match stdout_cross {
            None => stdout_explicit.unwrap(),
            Some(CrossTarget::Stderr) => match &stderr_explicit {
                Some(d) => clone_descriptor(d)?,
                None => Some(match &self.stderr {
                    Some(f) => f.try_clone()?,
                    None => real_stderr()?,
                }),
            },
            Some(CrossTarget::Stdout) => stdout_explicit.unwrap_or(None),
        };
        let stderr = match stderr_cross {
            None => stderr_explicit.unwrap(),
            Some(CrossTarget::Stdout) => match &stdout_explicit {
                Some(d) => clone_descriptor(d)?,
                None => Some(match &self.stdout {
                    Some(f) => f.try_clone()?,
                    None => real_stdout()?,
                }),
            },
            Some(CrossTarget::Stderr) => stderr_explicit.unwrap_or(None),
        };

        Ok(IoContext {
            stdin,
            stdout,
            stderr,
            stdin_writer,
            stdout_capture,
            stderr_capture,
        })
    }

    /// Derives a context identical to `self` except that stdout is forced to
    /// `file`. Used internally by `Pipe` to wire the producer's stdout to the
    /// write end of an anonymous pipe, bypassing option validation since pipe
    /// composition carries no option bag of its own.
    pub(crate) fn with_stdout(&self, file: File) -> io::Result<IoContext> {
        Ok(IoContext {
            stdin: clone_descriptor(&self.stdin)?,
            stdout: Some(file),
            stderr: clone_descriptor(&self.stderr)?,
            stdin_writer: None,
            stdout_capture: CaptureSlot::None,
            stderr_capture: CaptureSlot::None,
        })
    }

    /// Symmetric to [`with_stdout`](Self::with_stdout), for the pipe's
    /// consumer side.
    pub(crate) fn with_stdin(&self, file: File) -> io::Result<IoContext> {
        Ok(IoContext {
            stdin: Some(file),
            stdout: clone_descriptor(&self.stdout)?,
            stderr: clone_descriptor(&self.stderr)?,
            stdin_writer: None,
            stdout_capture: CaptureSlot::None,
            stderr_capture: CaptureSlot::None,
        })
    }

    pub(crate) fn stdin_stdio(&self) -> io::Result<Stdio> {
        match &self.stdin {
            Some(f) => Ok(Stdio::from(f.try_clone()?)),
            None => Ok(Stdio::inherit()),
        }
    }

    pub(crate) fn stdout_stdio(&self) -> io::Result<Stdio> {
        match &self.stdout {
            Some(f) => Ok(Stdio::from(f.try_clone()?)),
            None => Ok(Stdio::inherit()),
        }
    }

    pub(crate) fn stderr_stdio(&self) -> io::Result<Stdio> {
        match &self.stderr {
            Some(f) => Ok(Stdio::from(f.try_clone()?)),
            None => Ok(Stdio::inherit()),
        }
    }

    /// Tears the context down: closes this context's own copies of any owned
    /// descriptors (letting children still running elsewhere see EOF once
    /// their own copies close too), then joins every reader/writer thread,
    /// propagating the first failure. Must run on every exit path.
    pub(crate) fn finish(mut self) -> io::Result<TornDown> {
        trace!("tearing down I/O context");
        self.stdin.take();
        self.stdout.take();
        self.stderr.take();

        let writer_result = self.stdin_writer.take().map(ThreadWithReturn::join);
        let stdout = std::mem::take(&mut self.stdout_capture).finish()?;
        let stderr = std::mem::take(&mut self.stderr_capture).finish()?;
        if let Some(result) = writer_result {
            result?;
        }
        Ok(TornDown { stdout, stderr })
    }
}

fn resolve_stdin(
    source: StdinSource,
    parent: &Descriptor,
) -> io::Result<(Descriptor, Option<ThreadWithReturn<io::Result<()>>>)> {
    match source {
        StdinSource::Inherit => Ok((clone_descriptor(parent)?, None)),
        StdinSource::Null => Ok((Some(null_device(false)?), None)),
        StdinSource::Path(path) => Ok((Some(File::open(path)?), None)),
        StdinSource::File(file) => Ok((Some(file), None)),
        StdinSource::Input(data) => {
            let (reader, writer) = os_pipe::pipe()?;
            let mut writer_file = writer_into_file(writer);
            let handle = ThreadWithReturn::start(move || -> io::Result<()> {
                match writer_file.write_all(&data) {
                    Ok(()) => Ok(()),
                    // The child may exit without consuming all input; that's
                    // not a failure of the run.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    Err(e) => Err(e),
                }
            });
            Ok((Some(reader_into_file(reader)), Some(handle)))
        }
    }
}
