use crate::{cmd, sh, Bytes, Text, DEVNULL, STDERR, STDOUT};

#[test]
fn scenario_sh_read() {
    assert_eq!(sh(r#"echo "hello  world""#).read().unwrap(), "hello  world");
}

#[test]
fn scenario_bytes_capture() {
    let result = sh("head -c 10 /dev/zero").stdout(Bytes).run().unwrap();
    assert_eq!(result.stdout_bytes().unwrap(), &[0u8; 10]);
}

#[test]
fn scenario_checked_error_contains_status() {
    let err = cmd("false", Vec::<&str>::new()).run().unwrap_err();
    assert!(err.to_string().contains('1'));
}

#[test]
fn scenario_check_false_keeps_nonzero_status() {
    let result = cmd("false", Vec::<&str>::new()).check(false).run().unwrap();
    assert!(!result.success());
    assert_eq!(result.status.code(), Some(1));
}

#[test]
fn scenario_pipe_read() {
    let out = sh("head -c 3 /dev/zero")
        .pipe(("sed", ["s/./a/g"]))
        .read()
        .unwrap();
    assert_eq!(out, "aaa");
}

#[test]
fn scenario_then_short_circuit_on_success() {
    let out = cmd("true", Vec::<&str>::new())
        .then(("echo", ["hi"]))
        .read()
        .unwrap();
    assert_eq!(out, "hi");
}

#[test]
fn scenario_then_short_circuit_on_failure() {
    let out = cmd("false", Vec::<&str>::new())
        .then(("echo", ["hi"]))
        .check(false)
        .read()
        .unwrap();
    assert_eq!(out, "");
}

#[test]
fn scenario_input_feeds_sha1sum() {
    let out = cmd("sha1sum", Vec::<&str>::new())
        .input("foo")
        .read()
        .unwrap();
    assert_eq!(out, "0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33  -");
}

#[test]
fn scenario_stdout_stderr_swap() {
    // The swap is a leaf-level redirection; capturing it for inspection is a
    // separate concern attached to an enclosing subshell, not the same
    // option bag (setting .stdout(Text) on the leaf itself would simply
    // overwrite the swap instead of composing with it).
    let result = sh("echo hi; echo lo 1>&2")
        .stdout(STDERR)
        .stderr(STDOUT)
        .subshell()
        .stdout(Text)
        .stderr(Text)
        .run()
        .unwrap();
    assert_eq!(result.stdout_str().unwrap(), "lo\n");
    assert_eq!(result.stderr_str().unwrap(), "hi\n");
}

#[test]
fn scenario_pipe_status_is_right_most_nonzero() {
    let result = cmd("false", Vec::<&str>::new())
        .pipe(sh(r#"bash -c "exit 3""#))
        .check(false)
        .run()
        .unwrap();
    assert_eq!(result.status.code(), Some(3));
}

#[test]
fn scenario_subshell_merges_stderr_into_stdout() {
    let out = sh("echo foo >&2; false")
        .subshell()
        .check(false)
        .stderr(STDOUT)
        .read()
        .unwrap();
    assert_eq!(out, "foo");
}

#[test]
fn trim_false_preserves_trailing_newline() {
    let out = cmd("echo", ["hello"]).trim(false).read().unwrap();
    assert_eq!(out, "hello\n");
}

#[test]
fn pipe_aggregate_status_is_zero_when_both_succeed() {
    let result = cmd("true", Vec::<&str>::new())
        .pipe(cmd("true", Vec::<&str>::new()))
        .run()
        .unwrap();
    assert!(result.success());
}

#[test]
fn null_stdin_reads_as_empty() {
    let out = cmd("cat", Vec::<&str>::new()).stdin(DEVNULL).read().unwrap();
    assert_eq!(out, "");
}

#[test]
#[should_panic(expected = "env")]
fn env_and_full_env_are_mutually_exclusive() {
    cmd("true", Vec::<&str>::new())
        .env("A", "1")
        .full_env(std::iter::empty::<(&str, &str)>());
}

#[test]
#[should_panic(expected = "input")]
fn input_and_stdin_are_mutually_exclusive() {
    cmd("true", Vec::<&str>::new())
        .input("foo")
        .stdin(DEVNULL);
}

#[test]
fn nested_then_and_pipe_compose() {
    // (true && echo a) | cat
    let out = cmd("true", Vec::<&str>::new())
        .then(("echo", ["a"]))
        .pipe(cmd("cat", Vec::<&str>::new()))
        .read()
        .unwrap();
    assert_eq!(out, "a");
}
