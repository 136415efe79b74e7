//! Locating and loading libcephfs.
//!
//! The library is loaded at most once per process through [`load`] and shared
//! by every session; each session still creates its own mount handle. Lookup
//! tries the platform's canonical name through the dynamic linker search path
//! first, then the versioned soname, which is the only name some
//! distributions ship without the development package.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::ffi::LibCephFs;

/// Versioned soname tried when the canonical name does not resolve.
pub const FALLBACK_LIBRARY: &str = "libcephfs.so.1";

static LIBRARY: OnceCell<Arc<LibCephFs>> = OnceCell::new();

/// Library names tried by [`load`], in order.
pub fn candidates() -> Vec<String> {
    let canonical = libloading::library_filename("cephfs")
        .to_string_lossy()
        .into_owned();
    let mut names = vec![canonical];
    if names[0] != FALLBACK_LIBRARY {
        names.push(FALLBACK_LIBRARY.to_string());
    }
    names
}

/// Returns the process-wide libcephfs, loading it on first use.
///
/// Concurrent first calls are serialized; a failed load is not cached, so a
/// later call retries the lookup.
pub fn load() -> Result<Arc<LibCephFs>> {
    LIBRARY.get_or_try_init(load_first_candidate).cloned()
}

/// Loads the library a session built from `options` should use.
///
/// An explicit [`ClientOptions::library`] bypasses the process-wide cache.
pub fn load_for(options: &ClientOptions) -> Result<Arc<LibCephFs>> {
    match &options.library {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading libcephfs from explicit path");
            LibCephFs::open(path).map(Arc::new)
        }
        None => load(),
    }
}

fn load_first_candidate() -> Result<Arc<LibCephFs>> {
    let mut failures = Vec::new();
    for name in candidates() {
        match LibCephFs::open(&name) {
            Ok(library) => {
                tracing::debug!(library = %name, "Loaded libcephfs");
                return Ok(Arc::new(library));
            }
            Err(e) => {
                tracing::debug!(library = %name, error = %e, "libcephfs candidate failed");
                failures.push(e.to_string());
            }
        }
    }
    Err(Error::Environment(failures.join("; ")))
}
