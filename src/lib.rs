//! Composable subprocess expressions.
//!
//! The entry point is [`Expression`], an immutable tree built from [`cmd`]
//! and [`sh`] leaves and composed with [`Expression::pipe`],
//! [`Expression::then`], and [`Expression::subshell`]. Redirection,
//! environment, and error-checking options are attached with builder methods
//! and only take effect once the tree is materialised by [`Expression::run`]
//! or [`Expression::read`].
//!
//! # Examples
//!
//! Run a pipeline and check its combined exit status:
//!
//! ```
//! use subexpr::cmd;
//!
//! let result = (cmd("echo", ["hi"]).pipe(cmd("cat", Vec::<&str>::new()))).run().unwrap();
//! assert!(result.success());
//! ```
//!
//! Capture standard output as trimmed text:
//!
//! ```
//! use subexpr::cmd;
//!
//! let out = cmd("echo", ["hello"]).read().unwrap();
//! assert_eq!(out, "hello");
//! ```
//!
//! Run a sequence, stopping at the first failure:
//!
//! ```
//! use subexpr::cmd;
//!
//! let result = cmd("true", Vec::<&str>::new())
//!     .then(cmd("echo", ["reached"]))
//!     .run()
//!     .unwrap();
//! assert!(result.success());
//! ```

#![warn(missing_docs)]

mod engine;
mod error;
mod expr;
mod io_context;
mod options;
mod process;
mod result;
mod worker;

pub use error::{Error, Result};
pub use expr::{cmd, sh, Expression, IntoExpression};
pub use options::{Bytes, InputRedirection, OutputRedirection, Sentinel, Text, DEVNULL, STDERR, STDOUT};
pub use process::ExitStatus;
pub use result::RunResult;

#[cfg(unix)]
pub use expr::unix;

#[cfg(test)]
mod tests;
