//! Safe bindings to the native CephFS client library.
//!
//! This crate loads `libcephfs` at runtime and wraps its C API in a session
//! type with an explicit lifecycle.
//!
//! # Components
//!
//! - [`loader`] - locates and loads the shared library once per process
//! - [`NativeApi`] - every libcephfs entry point the binding calls, bound at
//!   load time by [`LibCephFs`]
//! - [`Error`] / [`translate`] - typed errors for native errno codes
//! - [`CephFs`] - one mount handle and its `configuring → initialized →
//!   mounted → shutdown` state machine
//! - [`NativeBuffer`] - ownership of library-allocated output buffers
//! - [`testing`] - an in-memory [`NativeApi`] for tests
//!
//! # Example
//!
//! ```no_run
//! use cephfs_core::{CephFs, ClientOptions, ConfFile};
//!
//! let options = ClientOptions::default()
//!     .conffile(ConfFile::Default)
//!     .option("client_mount_timeout", "30");
//!
//! let mut fs = CephFs::new(&options)?;
//! fs.mount()?;
//! fs.mkdir("/x", 0o755)?;
//! println!("{:o}", fs.stat("/x")?.st_mode);
//! fs.shutdown();
//! # Ok::<(), cephfs_core::Error>(())
//! ```
//!
//! # Platform
//!
//! The `stat`/`statvfs` layouts target 64-bit Linux with glibc.

pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod ffi;
pub mod loader;
pub mod types;

/// In-memory libcephfs stand-in for tests.
pub mod testing;

pub use buffer::NativeBuffer;
pub use client::{CephFs, MdsCommandOutput, State};
pub use config::{ClientOptions, ConfFile};
pub use error::{Error, Result, translate};
pub use ffi::{LibCephFs, NativeApi};
pub use types::{Stat, StatVfs, Timespec, Version};
