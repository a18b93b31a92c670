//! A lightweight, shareable handle to a started child process.
//!
//! Grounded on the teacher's `process.rs`: `Process` there wraps a raw PID
//! plus a `Mutex<ProcessState>` so that `wait`/`poll` can be called more than
//! once (and from more than one place in a pipeline walk) while only ever
//! reaping the child once. This crate launches children through
//! `std::process::Command` rather than hand-rolled `fork`/`execvp` (spec.md
//! treats the raw process/fd primitives as given), so `Process` wraps
//! `std::process::Child` instead of a bare PID, but keeps the same
//! cache-on-first-wait behavior, since `std::process::Child::wait` cannot
//! safely be called again once the child has been reaped.

use std::fmt;
use std::io;
use std::process::Child;
use std::sync::{Arc, Mutex};

/// The exit status of a leaf command.
///
/// Wraps `std::process::ExitStatus`. A signal-terminated child reports a
/// non-zero status; spec.md leaves the exact representation
/// implementation-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(std::process::ExitStatus);

impl ExitStatus {
    pub(crate) fn from_std(status: std::process::ExitStatus) -> ExitStatus {
        ExitStatus(status)
    }

    /// True if the exit status is 0.
    pub fn success(&self) -> bool {
        self.0.success()
    }

    /// The raw exit code, if the process exited normally.
    pub fn code(&self) -> Option<i32> {
        self.0.code()
    }

    /// The signal that killed the process, if any. Always `None` on Windows.
    #[cfg(unix)]
    pub fn signal(&self) -> Option<i32> {
        use std::os::unix::process::ExitStatusExt;
        self.0.signal()
    }

    /// The signal that killed the process, if any. Always `None` on Windows.
    #[cfg(windows)]
    pub fn signal(&self) -> Option<i32> {
        None
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
enum ProcessState {
    Running(Child),
    Finished(ExitStatus),
}

/// A handle to a running or finished subprocess.
///
/// Cheaply cloneable: clones share the same underlying child, so waiting on
/// one clone makes the exit status visible to all others. `Then` relies on
/// this to let the engine and the check-policy logic both observe the same
/// status without fighting over ownership of the `Child`.
#[derive(Debug, Clone)]
pub struct Process {
    inner: Arc<Mutex<ProcessState>>,
    pid: u32,
}

impl Process {
    pub(crate) fn new(child: Child) -> Process {
        let pid = child.id();
        Process {
            inner: Arc::new(Mutex::new(ProcessState::Running(child))),
            pid,
        }
    }

    /// The process ID.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Waits for the process to finish, returning its exit status.
    ///
    /// If the process has already been reaped (by a previous call to `wait`
    /// on this handle or a clone of it), returns the cached status without
    /// making a system call.
    pub fn wait(&self) -> io::Result<ExitStatus> {
        let mut state = self.inner.lock().unwrap();
        match &mut *state {
            ProcessState::Finished(status) => Ok(*status),
            ProcessState::Running(child) => {
                let status = ExitStatus::from_std(child.wait()?);
                *state = ProcessState::Finished(status);
                Ok(status)
            }
        }
    }

    /// Checks whether the process has finished, without blocking.
    pub fn poll(&self) -> Option<ExitStatus> {
        let mut state = self.inner.lock().unwrap();
        match &mut *state {
            ProcessState::Finished(status) => Some(*status),
            ProcessState::Running(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    let status = ExitStatus::from_std(status);
                    *state = ProcessState::Finished(status);
                    Some(status)
                }
                _ => None,
            },
        }
    }
}
