mod engine;
mod expr;
mod io_context;
mod options;
mod result;
mod worker;

use crate::{cmd, Bytes, Error, Expression, ExitStatus, RunResult, Text};

/// Initialises `env_logger` once per test binary, so `RUST_LOG=subexpr=trace
/// cargo test -- --nocapture` shows the engine's `debug!`/`trace!` output.
/// Idempotent: later calls after the first are no-ops.
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn public_types_are_send_and_sync() {
    assert_send_sync::<ExitStatus>();
    assert_send_sync::<RunResult>();
    assert_send_sync::<Error>();
    assert_send_sync::<Text>();
    assert_send_sync::<Bytes>();
}

fn read(expr: Expression) -> String {
    expr.read().unwrap()
}

#[test]
fn cmd_runs_and_succeeds() {
    init_logger();
    let result = cmd("true", Vec::<&str>::new()).run().unwrap();
    assert!(result.success());
}

#[test]
fn read_trims_trailing_newline() {
    assert_eq!(read(cmd("echo", ["hello"])), "hello");
}
