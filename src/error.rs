//! The error kinds surfaced by [`crate::Expression::run`] and friends.

use std::fmt;
use std::io;

use crate::process::ExitStatus;

/// Everything that can go wrong building or running an [`Expression`](crate::Expression).
///
/// Construction-time misuse (`env` together with `full_env`, `input` together
/// with `stdin`) is not represented here: it panics at the offending builder
/// call, the same way the teacher's `InputRedirection` impls panic on
/// `Redirection::Merge` for stdin. `Error` covers everything that can only be
/// known once a run is attempted.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An I/O operation failed: opening a redirection target, creating a
    /// pipe, spawning a child, or a background reader/writer thread failing.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The aggregate exit status was non-zero and `check` was in effect.
    #[error("command failed ({status}): {command}")]
    Checked {
        /// The aggregate exit status.
        status: ExitStatus,
        /// A human-readable description of the command that failed.
        command: String,
        /// Captured stderr, if any was available.
        stderr: Option<Vec<u8>>,
    },

    /// Captured output was accessed before the owning I/O context was torn
    /// down (reader threads joined).
    #[error("{0}")]
    State(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn checked(status: ExitStatus, command: impl fmt::Display, stderr: Option<Vec<u8>>) -> Error {
        Error::Checked {
            status,
            command: command.to_string(),
            stderr,
        }
    }
}
