//! The Execution Engine: walks an [`crate::Expression`], launching children
//! with correct descriptor inheritance and aggregating their results.
//!
//! Grounded on the teacher's `Pipeline::start`/`Job::join` (`pipeline.rs`,
//! `job.rs`), which wires a `Vec<Exec>` into an OS-level pipeline and then
//! waits each stage — but generalised to an arbitrary recursive tree (`Pipe`
//! and `Then` can nest, and either side can itself be a `Subshell`), which
//! the teacher's flat `Vec`-based `Pipeline` cannot express, per spec.md §3's
//! recursive data model.

use std::process::Command;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::expr::{os, ExprNode};
use crate::io_context::{pipe_files, IoContext};
use crate::options::EnvMode;
use crate::process::{ExitStatus, Process};
use crate::result::Captured;
use crate::worker::ThreadWithReturn;

/// What one node contributed: its own aggregate status, plus whatever it
/// captured at its own boundary (`None` for `Pipe`/`Then`, which never
/// capture directly — only a leaf or a `Subshell` owns a capturing context).
pub(crate) struct Outcome {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: Captured,
    pub(crate) stderr: Captured,
}

impl Outcome {
    fn uncaptured(status: ExitStatus) -> Outcome {
        Outcome {
            status,
            stdout: Captured::None,
            stderr: Captured::None,
        }
    }
}

pub(crate) fn describe(node: &ExprNode) -> String {
    match node {
        ExprNode::Cmd { program, args, .. } => {
            let mut s = program.to_string_lossy().into_owned();
            for a in args {
                s.push(' ');
                s.push_str(&a.to_string_lossy());
            }
            s
        }
        ExprNode::Sh { command, .. } => command.to_string_lossy().into_owned(),
        ExprNode::Pipe(l, r) => format!("{} | {}", describe(&l.0), describe(&r.0)),
        ExprNode::Then(l, r) => format!("{} && {}", describe(&l.0), describe(&r.0)),
        ExprNode::Subshell(inner, _) => describe(&inner.0),
    }
}

/// Dispatches on the node variant, implementing spec.md §4.5's walk.
pub(crate) fn exec_node(node: ExprNode, ctx: &IoContext) -> Result<Outcome> {
    match node {
        ExprNode::Cmd { program, args, options } => {
            let mut description = program.to_string_lossy().into_owned();
            for a in &args {
                description.push(' ');
                description.push_str(&a.to_string_lossy());
            }
            let mut command = Command::new(&program);
            command.args(&args);
            exec_leaf(description, command, options, ctx)
        }
        ExprNode::Sh { command: cmdline, options } => {
            let description = cmdline.to_string_lossy().into_owned();
            let mut command = Command::new(os::SHELL[0]);
            command.arg(os::SHELL[1]).arg(&cmdline);
            exec_leaf(description, command, options, ctx)
        }
        ExprNode::Pipe(left, right) => exec_pipe(left.0, right.0, ctx),
        ExprNode::Then(left, right) => exec_then(left.0, right.0, ctx),
        ExprNode::Subshell(inner, options) => exec_subshell(inner.0, options, ctx),
    }
}

fn exec_leaf(
    description: String,
    mut command: Command,
    mut options: crate::options::Options,
    ctx: &IoContext,
) -> Result<Outcome> {
    let leaf_ctx = ctx.derive(&mut options)?;

    if let Some(cwd) = &options.cwd {
        command.current_dir(cwd);
    }
    match &options.env_mode {
        EnvMode::Inherit => {}
        EnvMode::Merge(pairs) => {
            for (k, v) in pairs {
                command.env(k, v);
            }
        }
        EnvMode::Full(pairs) => {
            command.env_clear();
            for (k, v) in pairs {
                command.env(k, v);
            }
        }
    }
    #[cfg(unix)]
    apply_unix_identity(&mut command, &options);

    command.stdin(leaf_ctx.stdin_stdio()?);
    command.stdout(leaf_ctx.stdout_stdio()?);
    command.stderr(leaf_ctx.stderr_stdio()?);

    debug!("spawning {description}");
    let child = command.spawn()?;
    let process = Process::new(child);
    let status = process.wait()?;
    trace!("{description} exited with {status}");

    let torn = leaf_ctx.finish()?;
    let stdout = Captured::from_option(torn.stdout.into_bytes());
    let stderr = Captured::from_option(torn.stderr.into_bytes());

    // Note: `check` is deliberately not enforced here. spec.md treats `check`
    // as an aggregate-level property resolved at each `run`/`subshell`
    // boundary (see DESIGN.md), not per-leaf: a leaf nested inside a `Pipe`
    // or `Then` must be free to fail without raising on its own, so that the
    // enclosing composition can compute its aggregate status first. Only
    // `exec_subshell` and `Expression::run` apply `check`, against whichever
    // node's own options actually own that boundary.
    Ok(Outcome { status, stdout, stderr })
}

#[cfg(unix)]
fn apply_unix_identity(command: &mut Command, options: &crate::options::Options) {
    use std::os::unix::process::CommandExt;

    if let Some(uid) = options.setuid {
        command.uid(uid);
    }
    if let Some(gid) = options.setgid {
        command.gid(gid);
    }
    if options.setpgid {
        unsafe {
            command.pre_exec(|| {
                if libc::setpgid(0, 0) == 0 {
                    Ok(())
                } else {
                    Err(std::io::Error::last_os_error())
                }
            });
        }
    }
}

fn exec_then(left: ExprNode, right: ExprNode, ctx: &IoContext) -> Result<Outcome> {
    let left_outcome = exec_node(left, ctx)?;
    if !left_outcome.status.success() {
        return Ok(left_outcome);
    }
    exec_node(right, ctx)
}

fn exec_pipe(left: ExprNode, right: ExprNode, ctx: &IoContext) -> Result<Outcome> {
    let (read_end, write_end) = pipe_files()?;
    let left_ctx = ctx.with_stdout(write_end)?;
    let right_ctx = ctx.with_stdin(read_end)?;

    trace!("starting pipe: {} | {}", describe(&left), describe(&right));

    let left_handle = ThreadWithReturn::start(move || -> Result<Outcome> {
        let result = exec_node(left, &left_ctx);
        let finish = left_ctx.finish();
        let outcome = result?;
        finish?;
        Ok(outcome)
    });
    let right_handle = ThreadWithReturn::start(move || -> Result<Outcome> {
        let result = exec_node(right, &right_ctx);
        let finish = right_ctx.finish();
        let outcome = result?;
        finish?;
        Ok(outcome)
    });

    let left_result = left_handle.join();
    let right_result = right_handle.join();

    // Both sides are always joined before a failure from either is
    // re-raised (spec.md §7): a failure on the producer side must not
    // prevent the consumer from being reaped, and vice versa.
    let right_outcome = right_result?;
    let left_outcome = left_result?;

    let status = if !right_outcome.status.success() {
        right_outcome.status
    } else if !left_outcome.status.success() {
        left_outcome.status
    } else {
        right_outcome.status
    };
    Ok(Outcome::uncaptured(status))
}

fn exec_subshell(inner: ExprNode, mut options: crate::options::Options, ctx: &IoContext) -> Result<Outcome> {
    let description = describe(&inner);
    let sub_ctx = ctx.derive(&mut options)?;
    let check = options.effective_check();

    let inner_result = exec_node(inner, &sub_ctx);
    let torn = sub_ctx.finish()?;
    let stdout = Captured::from_option(torn.stdout.into_bytes());
    let stderr = Captured::from_option(torn.stderr.into_bytes());

    let status = inner_result?.status;
    if !status.success() && check {
        return Err(Error::checked(status, &description, stderr.as_bytes().map(<[u8]>::to_vec)));
    }
    Ok(Outcome { status, stdout, stderr })
}
