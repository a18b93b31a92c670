//! The Expression Tree: the immutable algebraic value describing what to run.
//!
//! Grounded on the teacher's `Exec` (leaf builder, `exec.rs`) and `Pipeline`
//! (`BitOr`-composed sequence, `pipeline.rs`), reshaped into spec.md §3's
//! closed `Cmd | Sh | Pipe | Then | Subshell` algebra. Where the teacher
//! exposes `Exec`/`Pipeline`/`Job` as three separate types stitched together
//! by the caller, this crate collapses them into one recursive `Expression`
//! so that `Pipe`/`Then`/`Subshell` can nest arbitrarily (spec.md's
//! `test_nesting`-equivalent: a `Then` chain piped into another `Then`
//! chain), which the teacher's flat `Pipeline` (a `Vec<Exec>`) cannot
//! represent.

use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::engine;
use crate::error::{Error, Result};
use crate::io_context::IoContext;
use crate::options::{InputRedirection, OutputRedirection, Options, Text};
use crate::result::RunResult;

#[cfg(unix)]
pub(crate) mod os {
    pub const SHELL: [&str; 2] = ["sh", "-c"];
}
#[cfg(windows)]
pub(crate) mod os {
    pub const SHELL: [&str; 2] = ["cmd.exe", "/c"];
}

/// One node of the expression tree.
///
/// `Cmd`/`Sh` are leaves; `Pipe`/`Then`/`Subshell` are internal nodes.
/// `Pipe`/`Then` carry no [`Options`] of their own — spec.md §3's "no option
/// kwargs are permitted on internal nodes" falls out structurally, since
/// there is simply no field to put them in; attaching options to a pipeline
/// or sequence requires [`Expression::subshell`].
pub(crate) enum ExprNode {
    Cmd {
        program: OsString,
        args: Vec<OsString>,
        options: Options,
    },
    Sh {
        command: OsString,
        options: Options,
    },
    Pipe(Box<Expression>, Box<Expression>),
    Then(Box<Expression>, Box<Expression>),
    Subshell(Box<Expression>, Options),
}

/// An immutable description of a process, or a composition of processes.
///
/// Construct one with [`cmd`] or [`sh`], attach redirections/environment with
/// the builder methods below, compose with [`Expression::pipe`]/
/// [`Expression::then`]/[`Expression::subshell`], and finish with
/// [`Expression::run`] or [`Expression::read`].
///
/// `Expression` is move-only: an in-progress builder chain is never observed
/// from two places at once in spec.md's own examples, and some leaf options
/// (an already-open `File` for `stdin`/`stdout`) cannot be cloned, so there is
/// no `Clone` impl to get wrong.
#[must_use]
pub struct Expression(pub(crate) ExprNode);

/// Constructs an [`Expression`] that runs `program` directly, bypassing the
/// shell. `program` is looked up on `PATH` unless it contains a path
/// separator. `args` is the argument vector; pass `Vec::<&str>::new()` or
/// `[] as [&str; 0]` for a command that takes none.
///
/// ```
/// # use subexpr::cmd;
/// let hi = cmd("echo", ["hi"]).read().unwrap();
/// assert_eq!(hi, "hi");
/// ```
pub fn cmd(program: impl AsRef<OsStr>, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Expression {
    Expression(ExprNode::Cmd {
        program: program.as_ref().to_owned(),
        args: args.into_iter().map(|a| a.as_ref().to_owned()).collect(),
        options: Options::new(),
    })
}

/// Constructs an [`Expression`] that runs `command_line` through the host
/// shell (`sh -c` on Unix, `cmd.exe /c` on Windows) — spec.md's `Sh` leaf.
/// Argument quoting inside `command_line` is the caller's responsibility;
/// this crate never interpolates untrusted data into it.
pub fn sh(command_line: impl AsRef<OsStr>) -> Expression {
    Expression(ExprNode::Sh {
        command: command_line.as_ref().to_owned(),
        options: Options::new(),
    })
}

/// Either an already-built [`Expression`], or the bare `program` / `(program,
/// args)` leaf shorthand accepted by [`Expression::pipe`]/[`Expression::then`]
/// — spec.md §4.4's "leaf argument tuple".
pub trait IntoExpression {
    #[doc(hidden)]
    fn into_expression(self) -> Expression;
}

impl IntoExpression for Expression {
    fn into_expression(self) -> Expression {
        self
    }
}

impl<S: AsRef<OsStr>> IntoExpression for S {
    fn into_expression(self) -> Expression {
        cmd(self, std::iter::empty::<OsString>())
    }
}

impl<P, A, S> IntoExpression for (P, A)
where
    P: AsRef<OsStr>,
    A: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    fn into_expression(self) -> Expression {
        cmd(self.0, self.1)
    }
}

impl Expression {
    /// Runs `self.with_options(f)`'s closure against this node's own option
    /// bag, auto-promoting a `Pipe`/`Then` node into a `Subshell` first.
    ///
    /// This is the structural reading of spec.md §4.4's "options may only be
    /// attached via `subshell` wrapping" for internal nodes: rather than
    /// rejecting the call, a bare `Pipe`/`Then` is silently given the fresh
    /// option bag the rule says it needs, exactly as if the caller had
    /// written `.subshell()` themselves.
    fn with_options(mut self, f: impl FnOnce(&mut Options)) -> Expression {
        match &mut self.0 {
            ExprNode::Cmd { options, .. }
            | ExprNode::Sh { options, .. }
            | ExprNode::Subshell(_, options) => {
                f(options);
                self
            }
            ExprNode::Pipe(..) | ExprNode::Then(..) => {
                let mut options = Options::new();
                f(&mut options);
                Expression(ExprNode::Subshell(Box::new(self), options))
            }
        }
    }

    /// Sets the working directory for this node's leaf (or every leaf under
    /// this subshell). Relative paths are resolved against the caller's cwd
    /// at run time.
    pub fn cwd(self, dir: impl AsRef<Path>) -> Expression {
        self.with_options(|o| o.cwd(dir))
    }

    /// Merges one environment variable into the inherited environment.
    /// Panics if `full_env` was already set on this node (mutual exclusion,
    /// spec.md §3).
    pub fn env(self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Expression {
        self.with_options(|o| o.env(key, value))
    }

    /// Replaces the inherited environment entirely with `vars`. Panics if
    /// `env` was already set on this node.
    pub fn full_env(
        self,
        vars: impl IntoIterator<Item = (impl AsRef<OsStr>, impl AsRef<OsStr>)>,
    ) -> Expression {
        self.with_options(|o| o.full_env(vars))
    }

    /// Feeds `data` on stdin via an internal pipe and background writer
    /// thread. Panics if `stdin` was already set on this node (mutual
    /// exclusion, spec.md §3).
    pub fn input(self, data: impl Into<Vec<u8>>) -> Expression {
        self.with_options(|o| o.input(data))
    }

    /// Sets the stdin source: a path, an open `File`, or [`crate::DEVNULL`].
    /// Panics if `input` was already set on this node.
    pub fn stdin(self, source: impl InputRedirection) -> Expression {
        self.with_options(|o| o.stdin(source))
    }

    /// Sets the stdout target: a path, an open `File`, [`crate::DEVNULL`],
    /// [`crate::STDERR`] (mirror stderr's target), or [`crate::Text`]/
    /// [`crate::Bytes`] to capture.
    pub fn stdout(self, out: impl OutputRedirection) -> Expression {
        self.with_options(|o| o.stdout(out))
    }

    /// Symmetric to [`Expression::stdout`], for standard error.
    pub fn stderr(self, out: impl OutputRedirection) -> Expression {
        self.with_options(|o| o.stderr(out))
    }

    /// Sets whether a non-zero aggregate exit status raises a checked error
    /// (default `true`). Calling this on a `Pipe`/`Then` scopes the check to
    /// the whole composed subtree, since it is promoted to a `Subshell`
    /// first.
    pub fn check(self, value: bool) -> Expression {
        self.with_options(|o| o.check(value))
    }

    /// Sets whether [`Expression::read`] trims one trailing `\n` (default
    /// `true`).
    pub fn trim(self, value: bool) -> Expression {
        self.with_options(|o| o.trim(value))
    }

    /// Connects this expression's stdout to `right`'s stdin via an anonymous
    /// pipe. Both sides run concurrently; the aggregate status is the
    /// right-most non-zero status, or success if both succeed (spec.md §4.5).
    pub fn pipe(self, right: impl IntoExpression) -> Expression {
        Expression(ExprNode::Pipe(Box::new(self), Box::new(right.into_expression())))
    }

    /// Runs this expression to completion; if it succeeds, runs `right` with
    /// the same I/O context and the combined status is `right`'s — otherwise
    /// `right` is not started and the combined status is this expression's
    /// (spec.md §4.5).
    pub fn then(self, right: impl IntoExpression) -> Expression {
        Expression(ExprNode::Then(Box::new(self), Box::new(right.into_expression())))
    }

    /// Wraps `self` so that redirections, environment, `cwd`, and `check` can
    /// be attached to the whole sub-tree rather than to a single leaf.
    pub fn subshell(self) -> Expression {
        Expression(ExprNode::Subshell(Box::new(self), Options::new()))
    }

    fn effective_trim(&self) -> bool {
        match &self.0 {
            ExprNode::Cmd { options, .. }
            | ExprNode::Sh { options, .. }
            | ExprNode::Subshell(_, options) => options.effective_trim(),
            ExprNode::Pipe(..) | ExprNode::Then(..) => true,
        }
    }

    /// Ensures there is a node at the root enforcing spec.md's default
    /// `check = true`. A bare `Pipe`/`Then` carries no option bag of its own
    /// (so nothing would ever raise a checked error for it); every other
    /// variant already enforces its own `check` during the walk.
    fn ensure_checking_boundary(self) -> Expression {
        if matches!(self.0, ExprNode::Pipe(..) | ExprNode::Then(..)) {
            Expression(ExprNode::Subshell(Box::new(self), Options::new()))
        } else {
            self
        }
    }

    /// Reads the `check` flag that governs the whole tree, from whichever
    /// node owns it after [`Expression::ensure_checking_boundary`] has run —
    /// always a `Cmd`, `Sh`, or `Subshell` at that point.
    fn root_check(&self) -> bool {
        match &self.0 {
            ExprNode::Cmd { options, .. }
            | ExprNode::Sh { options, .. }
            | ExprNode::Subshell(_, options) => options.effective_check(),
            ExprNode::Pipe(..) | ExprNode::Then(..) => {
                unreachable!("ensure_checking_boundary always wraps a bare Pipe/Then")
            }
        }
    }

    /// Runs the expression to completion and returns the aggregate status
    /// plus whatever streams were captured.
    ///
    /// Raises [`crate::Error::Checked`] if the aggregate status is non-zero
    /// and `check` is in effect at the node that owns it (default `true`).
    /// `Subshell` nodes enforce their own `check` during the walk itself
    /// (against their own inner aggregate); this only has to additionally
    /// handle the case of a bare `Cmd`/`Sh` run directly with no enclosing
    /// `Subshell` at all.
    pub fn run(self) -> Result<RunResult> {
        let rooted = self.ensure_checking_boundary();
        let check = rooted.root_check();
        let description = engine::describe(&rooted.0);
        let ctx = IoContext::root();
        let outcome = engine::exec_node(rooted.0, &ctx)?;
        if !outcome.status.success() && check {
            let stderr = outcome.stderr.as_bytes().map(<[u8]>::to_vec);
            return Err(Error::checked(outcome.status, &description, stderr));
        }
        Ok(RunResult::new(outcome.status, outcome.stdout, outcome.stderr))
    }

    /// Shorthand for `.stdout(Text).run()`, returning the captured stdout as
    /// a `String`. Trims one trailing `\n` unless [`Expression::trim`]`(false)`
    /// was set.
    pub fn read(self) -> Result<String> {
        let trim = self.effective_trim();
        let result = self.stdout(Text).run()?;
        let bytes = result.stdout_bytes().unwrap_or(&[]);
        let mut text = String::from_utf8_lossy(bytes).into_owned();
        if trim && text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }
}

/// Unix-only process-identity controls, applied at spawn time.
///
/// Ported from the teacher's `exec::unix::ExecExt`, which exposes the same
/// three knobs on `Exec`. There is no `send_signal`/`send_signal_group`
/// counterpart here: unlike the teacher's `Job`, this crate exposes no
/// non-blocking handle to a still-running tree (`Expression::run` always
/// waits to completion), so there is nothing left alive to signal by the
/// time a caller could reach for it.
#[cfg(unix)]
pub mod unix {
    use super::Expression;

    /// Extension methods attaching process-identity options to a leaf or a
    /// [`Expression::subshell`]-wrapped subtree.
    pub trait ExprExt {
        /// Sets the user ID the child process runs as (`setuid(2)` in the
        /// child, before `exec`).
        fn setuid(self, uid: u32) -> Self;

        /// Sets the group ID the child process runs as (`setgid(2)` in the
        /// child, before `exec`).
        fn setgid(self, gid: u32) -> Self;

        /// Puts the child in its own new process group (`setpgid(0, 0)`
        /// before `exec`).
        fn setpgid(self) -> Self;
    }

    impl ExprExt for Expression {
        fn setuid(self, uid: u32) -> Expression {
            self.with_options(|o| o.setuid(uid))
        }

        fn setgid(self, gid: u32) -> Expression {
            self.with_options(|o| o.setgid(gid))
        }

        fn setpgid(self) -> Expression {
            self.with_options(|o| o.setpgid())
        }
    }
}
