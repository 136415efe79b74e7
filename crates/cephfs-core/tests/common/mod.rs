//! Shared helpers for the stub-backed integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use cephfs_core::testing::StubNative;
use cephfs_core::{CephFs, ClientOptions};

static TRACING: Once = Once::new();

/// Routes library logs to the test harness (`RUST_LOG=debug` to see them).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A fresh stub and an unmounted session on it.
pub fn configuring() -> (Arc<StubNative>, CephFs<StubNative>) {
    with_options(&ClientOptions::default())
}

pub fn with_options(options: &ClientOptions) -> (Arc<StubNative>, CephFs<StubNative>) {
    init_tracing();
    let stub = Arc::new(StubNative::new());
    let fs = CephFs::with_api(Arc::clone(&stub), options).expect("session creation failed");
    (stub, fs)
}

/// A fresh stub and a mounted session on it.
pub fn mounted() -> (Arc<StubNative>, CephFs<StubNative>) {
    let (stub, mut fs) = configuring();
    fs.mount().expect("mount failed");
    (stub, fs)
}
