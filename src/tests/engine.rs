use crate::cmd;

#[test]
fn pipe_does_not_deadlock_on_larger_than_pipe_buffer_output() {
    // Exercises the thread-per-side model: if the engine waited on one side
    // before starting the other, a producer writing more than a pipe buffer
    // (64 KiB on Linux) would block forever with nothing draining its stdout.
    let out = cmd("head", ["-c", "1000000", "/dev/zero"])
        .pipe(cmd("wc", ["-c"]))
        .read()
        .unwrap();
    assert_eq!(out.trim(), "1000000");
}

#[test]
fn failure_on_producer_side_does_not_block_consumer_reap() {
    // The consumer (`cat`) succeeds, so it never blocks waiting on a producer
    // that already exited; the producer's own non-zero status still becomes
    // the aggregate per the right-most-non-zero law (section 8), since the
    // consumer's status is zero.
    let result = crate::sh("head -c 1000 /dev/zero; exit 5")
        .pipe(cmd("cat", Vec::<&str>::new()))
        .check(false)
        .run()
        .unwrap();
    assert_eq!(result.status.code(), Some(5));
}

#[test]
fn then_runs_right_only_after_left_finishes() {
    let tmpdir = tempfile::TempDir::new().unwrap();
    let path = tmpdir.path().join("order.txt");
    let left = crate::sh(format!("printf a >> {}", path.display()));
    let right = crate::sh(format!("printf b >> {}", path.display()));
    left.then(right).run().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "ab");
}

#[test]
fn cwd_sets_working_directory_for_leaf() {
    let tmpdir = tempfile::TempDir::new().unwrap();
    let out = cmd("pwd", Vec::<&str>::new())
        .cwd(tmpdir.path())
        .read()
        .unwrap();
    let canonical = std::fs::canonicalize(tmpdir.path()).unwrap();
    assert_eq!(std::path::Path::new(&out), canonical);
}

#[test]
fn env_var_is_visible_to_child() {
    let out = sh_echo_env().env("SUBEXPR_TEST_VAR", "marker").read().unwrap();
    assert_eq!(out, "marker");
}

fn sh_echo_env() -> crate::Expression {
    crate::sh("echo -n \"$SUBEXPR_TEST_VAR\"")
}

#[test]
fn full_env_replaces_inherited_environment() {
    // Uses an absolute path so the lookup doesn't itself depend on PATH,
    // which full_env is about to clear.
    let out = crate::cmd("/usr/bin/env", Vec::<&str>::new())
        .full_env([("ONLY", "this")])
        .read()
        .unwrap();
    assert_eq!(out, "ONLY=this");
}
