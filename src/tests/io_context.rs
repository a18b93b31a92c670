use std::io;
use std::sync::mpsc;

use crate::error::Error;
use crate::io_context::{pipe_files, CaptureSlot, IoContext};
use crate::options::Options;
use crate::worker::ThreadWithReturn;
use crate::Text;

#[test]
fn capture_access_before_finish_is_a_state_error_then_ready_after() {
    let (unblock_tx, unblock_rx) = mpsc::channel::<()>();
    let pending = CaptureSlot::Pending(ThreadWithReturn::start(move || -> io::Result<Vec<u8>> {
        unblock_rx.recv().ok();
        Ok(b"done".to_vec())
    }));

    assert!(matches!(pending.bytes(), Err(Error::State(_))));

    unblock_tx.send(()).unwrap();
    let ready = pending.finish().unwrap();
    assert_eq!(ready.bytes().unwrap(), Some(&b"done"[..]));
}

#[test]
fn derive_resolves_capture_target_into_a_real_pipe() {
    let root = IoContext::root();
    let mut opts = Options::new();
    opts.stdout(Text);
    // Just exercises that deriving a capturing context doesn't fail before
    // any process has written to it; the full capture path is covered by
    // the higher-level `stdout(Text)`/`read()` scenarios.
    let child = root.derive(&mut opts).unwrap();
    let torn = child.finish().unwrap();
    assert_eq!(torn.stdout.into_bytes(), Some(Vec::new()));
}

#[test]
fn pipe_files_are_connected() {
    use std::io::{Read, Write};

    let (mut read_end, mut write_end) = pipe_files().unwrap();
    write_end.write_all(b"hi").unwrap();
    drop(write_end);
    let mut buf = Vec::new();
    read_end.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"hi");
}
