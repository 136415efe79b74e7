pub mod admin;
pub mod conf_get;
pub mod mkdir;
pub mod rm;
pub mod setxattr;
pub mod stat;
pub mod statfs;
pub mod version;

/// Normalize a CephFS path to ensure it starts with `/`.
/// A fresh session's working directory is the root, so `dir/file` and
/// `/dir/file` name the same entry.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use cephfs_core::testing::StubNative;
    use cephfs_core::{CephFs, ClientOptions};

    pub fn mounted() -> (Arc<StubNative>, CephFs<StubNative>) {
        let stub = Arc::new(StubNative::new());
        let mut fs = CephFs::with_api(Arc::clone(&stub), &ClientOptions::default()).unwrap();
        fs.mount().unwrap();
        (stub, fs)
    }
}
