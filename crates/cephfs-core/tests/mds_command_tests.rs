//! MDS command output handling.

mod common;

use cephfs_core::Error;
use cephfs_core::testing::MdsResponse;

#[test]
fn test_success_returns_both_buffers() {
    let (stub, fs) = common::mounted();
    stub.set_mds_response(MdsResponse {
        status: 0,
        data: Some(br#"{"clients":[]}"#.to_vec()),
        status_text: Some(b"ok".to_vec()),
    });

    let output = fs.mds_command("*", &["session", "ls"], b"").unwrap();
    assert!(output.is_success());
    assert_eq!(output.status, 0);
    assert_eq!(output.data, br#"{"clients":[]}"#);
    assert_eq!(output.status_str(), "ok");

    assert_eq!(stub.calls("ceph_mds_command"), 1);
    assert_eq!(stub.calls("ceph_buffer_free"), 2);
    assert_eq!(stub.live_buffers(), 0);
}

#[test]
fn test_failure_status_is_returned_and_buffers_released() {
    let (stub, fs) = common::mounted();
    stub.set_mds_response(MdsResponse {
        status: -libc::EINVAL,
        data: Some(Vec::new()),
        status_text: Some(b"unrecognized command".to_vec()),
    });

    let output = fs.mds_command("0", &["bogus"], b"").unwrap();
    assert!(!output.is_success());
    assert_eq!(output.status, -libc::EINVAL);
    assert!(output.data.is_empty());
    assert_eq!(output.status_str(), "unrecognized command");
    assert_eq!(stub.calls("ceph_buffer_free"), 2);
    assert_eq!(stub.live_buffers(), 0);

    let err = output.into_result().unwrap_err();
    assert!(matches!(err, Error::Native { code, .. } if code == libc::EINVAL));
    assert!(err.to_string().contains("unrecognized command"));
}

#[test]
fn test_null_buffers_are_not_freed() {
    let (stub, fs) = common::mounted();
    stub.set_mds_response(MdsResponse {
        status: -libc::ENOENT,
        data: None,
        status_text: None,
    });

    let output = fs.mds_command("a", &["status"], b"").unwrap();
    assert_eq!(output.status, -libc::ENOENT);
    assert!(output.data.is_empty());
    assert!(output.status_text.is_empty());
    assert_eq!(stub.calls("ceph_buffer_free"), 0);
    assert!(matches!(output.into_result(), Err(Error::ObjectNotFound { .. })));
}

#[test]
fn test_only_status_text_allocated() {
    let (stub, fs) = common::mounted();
    stub.set_mds_response(MdsResponse {
        status: 0,
        data: None,
        status_text: Some(b"done".to_vec()),
    });
    let output = fs.mds_command("*", &["flush", "journal"], b"").unwrap();
    assert!(output.data.is_empty());
    assert_eq!(output.status_text, b"done");
    assert_eq!(stub.calls("ceph_buffer_free"), 1);
    assert_eq!(stub.live_buffers(), 0);
}

#[test]
fn test_binary_output_is_preserved() {
    let (stub, fs) = common::mounted();
    let payload: Vec<u8> = (0..=255).collect();
    stub.set_mds_response(MdsResponse {
        status: 0,
        data: Some(payload.clone()),
        status_text: Some(Vec::new()),
    });
    let output = fs.mds_command("*", &["dump"], b"\x00\x01input").unwrap();
    assert_eq!(output.data, payload);
    assert!(output.status_text.is_empty());
    assert_eq!(stub.live_buffers(), 0);
}

#[test]
fn test_repeated_commands_do_not_leak() {
    let (stub, fs) = common::mounted();
    stub.set_mds_response(MdsResponse {
        status: 0,
        data: Some(b"x".to_vec()),
        status_text: Some(b"y".to_vec()),
    });
    for _ in 0..10 {
        fs.mds_command("*", &["status"], b"").unwrap();
    }
    assert_eq!(stub.calls("ceph_buffer_free"), 20);
    assert_eq!(stub.live_buffers(), 0);
}

#[test]
fn test_nul_in_command_argument_is_rejected() {
    let (stub, fs) = common::mounted();
    let before = stub.total_calls();
    let err = fs.mds_command("*", &["sta\0tus"], b"").unwrap_err();
    assert!(matches!(err, Error::ArgumentType { name: "args", .. }));
    assert_eq!(stub.total_calls(), before);
}

#[test]
fn test_mds_command_requires_mount() {
    let (stub, fs) = common::configuring();
    let err = fs.mds_command("*", &["status"], b"").unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
    assert_eq!(stub.calls("ceph_mds_command"), 0);
}
