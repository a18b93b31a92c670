use std::fs::{self, File};

use tempfile::TempDir;

use crate::{cmd, Bytes, DEVNULL, STDOUT};

#[test]
#[should_panic(expected = "stdin")]
fn stdout_sentinel_rejected_on_stdin() {
    cmd("cat", Vec::<&str>::new()).stdin(STDOUT);
}

#[test]
fn redirect_stdout_to_path() {
    let tmpdir = TempDir::new().unwrap();
    let path = tmpdir.path().join("out.txt");
    let result = cmd("echo", ["hi"]).stdout(path.clone()).run().unwrap();
    assert!(result.success());
    assert_eq!(fs::read_to_string(&path).unwrap(), "hi\n");
}

#[test]
fn redirect_stdin_from_open_file() {
    let tmpdir = TempDir::new().unwrap();
    let path = tmpdir.path().join("in.txt");
    fs::write(&path, "from file\n").unwrap();
    let file = File::open(&path).unwrap();
    let out = cmd("cat", Vec::<&str>::new()).stdin(file).read().unwrap();
    assert_eq!(out, "from file");
}

#[test]
fn capture_bytes_preserves_non_utf8() {
    let result = cmd("printf", [r"\xff"]).stdout(Bytes).run().unwrap();
    assert_eq!(result.stdout_bytes().unwrap(), &[0xffu8]);
}

#[test]
fn devnull_stdout_discards_output() {
    let result = cmd("echo", ["should be discarded"])
        .stdout(DEVNULL)
        .run()
        .unwrap();
    assert!(result.success());
    assert!(result.stdout_bytes().is_none());
}
