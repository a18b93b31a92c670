use crate::{cmd, Bytes, Text};

#[test]
fn uncaptured_streams_are_none() {
    let result = cmd("true", Vec::<&str>::new()).run().unwrap();
    assert!(result.stdout_bytes().is_none());
    assert!(result.stderr_bytes().is_none());
    assert!(result.stdout_str().is_none());
}

#[test]
fn text_capture_decodes_as_str() {
    let result = cmd("echo", ["-n", "foo"]).stdout(Text).run().unwrap();
    assert_eq!(result.stdout_str().unwrap(), "foo");
}

#[test]
fn bytes_capture_exposes_raw_bytes_only() {
    let result = cmd("echo", ["-n", "foo"]).stdout(Bytes).run().unwrap();
    assert_eq!(result.stdout_bytes().unwrap(), b"foo");
}

#[test]
fn success_reflects_aggregate_status() {
    let ok = cmd("true", Vec::<&str>::new()).run().unwrap();
    assert!(ok.success());

    let failed = cmd("false", Vec::<&str>::new()).check(false).run().unwrap();
    assert!(!failed.success());
}
