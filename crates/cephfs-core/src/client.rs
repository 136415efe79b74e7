//! The CephFS session client.
//!
//! A [`CephFs`] owns exactly one native mount handle and walks it through the
//! libcephfs lifecycle:
//!
//! ```text
//! Configuring --init()--> Initialized --mount()--> Mounted --shutdown()--> Shutdown
//!      \________________________mount()_______________/
//! ```
//!
//! Every state-sensitive operation checks the current [`State`] before doing
//! anything else, and string arguments are converted to C strings before the
//! native call, so a rejected call never reaches libcephfs.
//!
//! # Threading
//!
//! A session may be moved to another thread but not shared between threads:
//! the state machine has no locking of its own. Every call blocks the calling
//! thread until libcephfs returns.

use std::ffi::{CStr, CString, c_char, c_int};
use std::fmt;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use serde::Serialize;

use crate::buffer::NativeBuffer;
use crate::config::{ClientOptions, ConfFile};
use crate::error::{Error, Result, check, check_nonneg, magnitude, translate};
use crate::ffi::{CephMountInfo, LibCephFs, NativeApi};
use crate::loader;
use crate::types::{RawStat, RawStatVfs, Stat, StatVfs, Version};

/// Initial `ceph_conf_get` buffer size; doubled on `-ENAMETOOLONG`.
const CONF_GET_INITIAL_LEN: usize = 20;

/// Upper bound for the `ceph_conf_get` buffer.
const CONF_GET_MAX_LEN: usize = 1 << 20;

/// Lifecycle state of a [`CephFs`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Handle created; configuration may be read and changed.
    Configuring,
    /// `ceph_init` succeeded; not yet attached to the filesystem.
    Initialized,
    /// Attached to the filesystem; I/O operations are allowed.
    Mounted,
    /// Handle destroyed. Terminal.
    Shutdown,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Configuring => "configuring",
            State::Initialized => "initialized",
            State::Mounted => "mounted",
            State::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an MDS administrative command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdsCommandOutput {
    /// Return code of `ceph_mds_command` (0 or a negative errno).
    pub status: i32,
    /// Command output data.
    pub data: Vec<u8>,
    /// Human-readable status text.
    pub status_text: Vec<u8>,
}

impl MdsCommandOutput {
    pub fn is_success(&self) -> bool {
        self.status >= 0
    }

    /// Status text decoded lossily as UTF-8.
    pub fn status_str(&self) -> String {
        String::from_utf8_lossy(&self.status_text).into_owned()
    }

    /// Converts a negative status into a translated error, using the status
    /// text as context.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(translate(
                self.status,
                format!("mds command failed: {}", self.status_str()),
            ))
        }
    }
}

/// The owned native handle. Not `Sync`: a session is driven from one thread
/// at a time.
struct MountHandle(NonNull<CephMountInfo>);

// SAFETY: libcephfs handles are not tied to the creating thread.
unsafe impl Send for MountHandle {}

/// Converts a string argument for the native boundary.
fn c_string(name: &'static str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|e| Error::ArgumentType {
        name,
        reason: format!("contains a NUL byte at offset {}", e.nul_position()),
    })
}

fn c_path(name: &'static str, path: &Path) -> Result<CString> {
    let value = path.to_str().ok_or_else(|| Error::ArgumentType {
        name,
        reason: format!("{} is not valid UTF-8", path.display()),
    })?;
    c_string(name, value)
}

/// A CephFS session backed by one libcephfs mount handle.
///
/// Dropping the session shuts it down.
///
/// # Example
///
/// ```no_run
/// use cephfs_core::{CephFs, ClientOptions, ConfFile};
///
/// let options = ClientOptions::default().conffile(ConfFile::Default);
/// let fs = CephFs::connect(&options)?;
/// fs.mkdir("/scratch", 0o755)?;
/// let stat = fs.stat("/scratch")?;
/// assert!(stat.is_dir());
/// # Ok::<(), cephfs_core::Error>(())
/// ```
pub struct CephFs<A: NativeApi = LibCephFs> {
    api: Arc<A>,
    handle: MountHandle,
    state: State,
}

impl CephFs<LibCephFs> {
    /// Loads libcephfs and creates a session in the `Configuring` state.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let api = loader::load_for(options)?;
        Self::with_api(api, options)
    }

    /// Creates a session and mounts the filesystem root.
    pub fn connect(options: &ClientOptions) -> Result<Self> {
        let mut fs = Self::new(options)?;
        fs.mount()?;
        Ok(fs)
    }
}

impl<A: NativeApi> CephFs<A> {
    /// Creates a session on an already loaded native library.
    ///
    /// After `ceph_create` succeeds the configuration file and options from
    /// `options` are applied; if any of them fails the handle is shut down
    /// and the error returned.
    pub fn with_api(api: Arc<A>, options: &ClientOptions) -> Result<Self> {
        let id = options
            .id
            .as_deref()
            .map(|id| c_string("id", id))
            .transpose()?;
        let mut cmount: *mut CephMountInfo = ptr::null_mut();
        // SAFETY: `cmount` is a valid out-parameter and `id` outlives the call.
        let ret = unsafe {
            api.create(
                &raw mut cmount,
                id.as_ref().map_or(ptr::null(), |id| id.as_ptr()),
            )
        };
        if ret != 0 {
            return Err(Error::Native {
                context: "ceph_create failed".to_string(),
                code: magnitude(ret),
            });
        }
        let handle = NonNull::new(cmount).ok_or_else(|| Error::Native {
            context: "ceph_create returned a null handle".to_string(),
            code: libc::EFAULT,
        })?;
        tracing::debug!(id = ?options.id, "Created libcephfs mount handle");

        let mut fs = Self {
            api,
            handle: MountHandle(handle),
            state: State::Configuring,
        };
        match &options.conffile {
            ConfFile::None => {}
            ConfFile::Default => fs.conf_read_file(None)?,
            ConfFile::Path(path) => fs.conf_read_file(Some(path.as_path()))?,
        }
        for (option, value) in &options.conf {
            fs.conf_set(option, value)?;
        }
        Ok(fs)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.state == State::Mounted
    }

    /// Fails with [`Error::InvalidState`] unless the session is in one of
    /// `allowed`.
    pub fn require_state(&self, allowed: &[State]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState { state: self.state })
        }
    }

    fn raw(&self) -> *mut CephMountInfo {
        self.handle.0.as_ptr()
    }

    /// Version of the loaded libcephfs. Valid in every state.
    pub fn version(&self) -> Version {
        let (mut major, mut minor, mut patch): (c_int, c_int, c_int) = (0, 0, 0);
        // SAFETY: the three out-parameters are valid for writes.
        let text = unsafe { self.api.version(&raw mut major, &raw mut minor, &raw mut patch) };
        let text = if text.is_null() {
            String::new()
        } else {
            // SAFETY: libcephfs returns a static NUL-terminated string.
            unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
        };
        Version {
            major,
            minor,
            patch,
            text,
        }
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    /// Reads a ceph.conf. `None` reads the library's default search path.
    pub fn conf_read_file(&mut self, path: Option<&Path>) -> Result<()> {
        self.require_state(&[State::Configuring])?;
        let path = path.map(|p| c_path("conffile", p)).transpose()?;
        // SAFETY: live handle; `path` is null or NUL-terminated.
        let ret = unsafe {
            self.api.conf_read_file(
                self.raw(),
                path.as_ref().map_or(ptr::null(), |p| p.as_ptr()),
            )
        };
        check(ret, || "error calling conf_read_file".to_string())
    }

    /// Parses command-line style options (`--key=value`, `--key value`).
    ///
    /// `argv` is a full argument vector: `argv[0]` is the program name and
    /// is never parsed as an option.
    pub fn conf_parse_argv(&mut self, argv: &[&str]) -> Result<()> {
        self.require_state(&[State::Configuring])?;
        let args = argv
            .iter()
            .map(|a| c_string("argv", a))
            .collect::<Result<Vec<_>>>()?;
        let argc = c_int::try_from(args.len()).map_err(|_| Error::ArgumentType {
            name: "argv",
            reason: format!("{} arguments exceed the C int range", args.len()),
        })?;
        let mut ptrs: Vec<*const c_char> = args.iter().map(|a| a.as_ptr()).collect();
        // SAFETY: live handle; `ptrs` holds `argc` pointers into `args`.
        let ret = unsafe { self.api.conf_parse_argv(self.raw(), argc, ptrs.as_mut_ptr()) };
        check(ret, || "error calling conf_parse_argv".to_string())
    }

    /// Reads a configuration value; `None` when the option does not exist.
    pub fn conf_get(&self, option: &str) -> Result<Option<String>> {
        self.require_state(&[State::Configuring, State::Initialized])?;
        let c_option = c_string("option", option)?;
        let mut len = CONF_GET_INITIAL_LEN;
        loop {
            let mut buf = vec![0u8; len];
            // SAFETY: live handle; `buf` has room for `len` bytes.
            let ret = unsafe {
                self.api.conf_get(
                    self.raw(),
                    c_option.as_ptr(),
                    buf.as_mut_ptr().cast::<c_char>(),
                    len,
                )
            };
            match ret {
                0 => {
                    let value = match CStr::from_bytes_until_nul(&buf) {
                        Ok(value) => value.to_string_lossy().into_owned(),
                        Err(_) => String::from_utf8_lossy(&buf).into_owned(),
                    };
                    return Ok(Some(value));
                }
                ret if ret == -libc::ENAMETOOLONG && len < CONF_GET_MAX_LEN => len *= 2,
                ret if ret == -libc::ENOENT => return Ok(None),
                _ => return Err(translate(ret, "error calling conf_get")),
            }
        }
    }

    /// Sets one configuration option.
    pub fn conf_set(&mut self, option: &str, value: &str) -> Result<()> {
        self.require_state(&[State::Configuring, State::Initialized])?;
        let c_option = c_string("option", option)?;
        let c_value = c_string("value", value)?;
        // SAFETY: live handle; both strings are NUL-terminated.
        let ret = unsafe { self.api.conf_set(self.raw(), c_option.as_ptr(), c_value.as_ptr()) };
        check(ret, || "error calling conf_set".to_string())?;
        tracing::debug!(option, value, "Set libcephfs option");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Initializes the client. On failure the session stays `Configuring`.
    pub fn init(&mut self) -> Result<()> {
        self.require_state(&[State::Configuring])?;
        // SAFETY: live handle.
        let ret = unsafe { self.api.init(self.raw()) };
        check(ret, || "error calling ceph_init".to_string())?;
        self.state = State::Initialized;
        tracing::debug!("libcephfs client initialized");
        Ok(())
    }

    /// Mounts the filesystem root, initializing first if needed.
    pub fn mount(&mut self) -> Result<()> {
        self.mount_at("/")
    }

    /// Mounts `root` as the session root, initializing first if needed.
    pub fn mount_at(&mut self, root: &str) -> Result<()> {
        self.require_state(&[State::Configuring, State::Initialized])?;
        let c_root = c_string("root", root)?;
        if self.state == State::Configuring {
            self.init()?;
        }
        // SAFETY: live handle; `c_root` is NUL-terminated.
        let ret = unsafe { self.api.mount(self.raw(), c_root.as_ptr()) };
        check(ret, || "error calling ceph_mount".to_string())?;
        self.state = State::Mounted;
        tracing::info!(root, "Mounted CephFS");
        Ok(())
    }

    /// Unmounts and destroys the native handle. Further calls do nothing.
    pub fn shutdown(&mut self) {
        if self.state == State::Shutdown {
            return;
        }
        let previous = self.state;
        // SAFETY: live handle, destroyed exactly once because of the state
        // check above.
        unsafe { self.api.shutdown(self.raw()) };
        self.state = State::Shutdown;
        tracing::info!(from = %previous, "CephFS session shut down");
    }

    // ---------------------------------------------------------------------
    // Filesystem operations (Mounted only)
    // ---------------------------------------------------------------------

    /// Filesystem capacity for the filesystem containing `path`.
    pub fn statfs(&self, path: &str) -> Result<StatVfs> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        let mut raw = RawStatVfs::default();
        // SAFETY: live handle; `raw` is a writable statvfs record.
        let ret = unsafe { self.api.statfs(self.raw(), c_path.as_ptr(), &raw mut raw) };
        check_nonneg(ret, || format!("statfs failed: {path}"))?;
        Ok(raw.into())
    }

    /// Flushes dirty metadata and data to the cluster.
    pub fn sync_fs(&self) -> Result<()> {
        self.require_state(&[State::Mounted])?;
        // SAFETY: live handle.
        let ret = unsafe { self.api.sync_fs(self.raw()) };
        check_nonneg(ret, || "sync_fs failed".to_string())?;
        Ok(())
    }

    /// Current working directory of the session.
    pub fn getcwd(&self) -> Result<String> {
        self.require_state(&[State::Mounted])?;
        // SAFETY: live handle.
        let cwd = unsafe { self.api.getcwd(self.raw()) };
        if cwd.is_null() {
            return Err(Error::Io {
                context: "getcwd returned no path".to_string(),
            });
        }
        // SAFETY: non-null, NUL-terminated, owned by the handle and copied
        // before any other call can change it.
        Ok(unsafe { CStr::from_ptr(cwd) }.to_string_lossy().into_owned())
    }

    pub fn chdir(&self, path: &str) -> Result<()> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        // SAFETY: live handle; `c_path` is NUL-terminated.
        let ret = unsafe { self.api.chdir(self.raw(), c_path.as_ptr()) };
        check_nonneg(ret, || format!("chdir failed: {path}"))?;
        Ok(())
    }

    /// Creates one directory. The parent must exist.
    pub fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        tracing::debug!(path, mode = format_args!("{mode:o}"), "mkdir");
        // SAFETY: live handle; `c_path` is NUL-terminated.
        let ret = unsafe { self.api.mkdir(self.raw(), c_path.as_ptr(), mode) };
        check_nonneg(ret, || format!("error in mkdir '{path}'"))?;
        Ok(())
    }

    /// Creates a directory and any missing parents.
    pub fn mkdirs(&self, path: &str, mode: u32) -> Result<()> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        // SAFETY: live handle; `c_path` is NUL-terminated.
        let ret = unsafe { self.api.mkdirs(self.raw(), c_path.as_ptr(), mode) };
        check_nonneg(ret, || format!("error in mkdirs '{path}'"))?;
        Ok(())
    }

    /// Opens a file and returns its descriptor.
    ///
    /// The descriptor is owned by the caller and must be passed to
    /// [`CephFs::close`]; the session does not track it.
    pub fn open(&self, path: &str, flags: i32, mode: u32) -> Result<i32> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        // SAFETY: live handle; `c_path` is NUL-terminated.
        let ret = unsafe { self.api.open(self.raw(), c_path.as_ptr(), flags, mode) };
        check_nonneg(ret, || format!("error in open '{path}'"))
    }

    pub fn close(&self, fd: i32) -> Result<()> {
        self.require_state(&[State::Mounted])?;
        // SAFETY: live handle.
        let ret = unsafe { self.api.close(self.raw(), fd) };
        check_nonneg(ret, || "error in close".to_string())?;
        Ok(())
    }

    /// Sets an extended attribute. `flags` takes `XATTR_CREATE` /
    /// `XATTR_REPLACE` or 0.
    pub fn setxattr(&self, path: &str, name: &str, value: &[u8], flags: i32) -> Result<()> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        let c_name = c_string("name", name)?;
        // SAFETY: live handle; strings are NUL-terminated and `value` is
        // readable for `value.len()` bytes.
        let ret = unsafe {
            self.api.setxattr(
                self.raw(),
                c_path.as_ptr(),
                c_name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                flags,
            )
        };
        check_nonneg(ret, || format!("error in setxattr: {path} {name}"))?;
        Ok(())
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        let mut raw = RawStat::default();
        // SAFETY: live handle; `raw` is a writable stat record.
        let ret = unsafe { self.api.stat(self.raw(), c_path.as_ptr(), &raw mut raw) };
        check_nonneg(ret, || format!("error in stat: {path}"))?;
        Ok(raw.into())
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        self.require_state(&[State::Mounted])?;
        let c_path = c_string("path", path)?;
        // SAFETY: live handle; `c_path` is NUL-terminated.
        let ret = unsafe { self.api.unlink(self.raw(), c_path.as_ptr()) };
        check_nonneg(ret, || format!("error in unlink: {path}"))?;
        Ok(())
    }

    /// Sends an administrative command to the MDS daemons matching
    /// `mds_spec`.
    ///
    /// The command's own status is returned in [`MdsCommandOutput::status`]
    /// rather than as an error, together with both output buffers; use
    /// [`MdsCommandOutput::into_result`] to turn a failure status into an
    /// [`Error`]. The native output buffers are copied and released before
    /// this returns.
    pub fn mds_command(
        &self,
        mds_spec: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<MdsCommandOutput> {
        self.require_state(&[State::Mounted])?;
        let c_spec = c_string("mds_spec", mds_spec)?;
        let c_args = args
            .iter()
            .map(|a| c_string("args", a))
            .collect::<Result<Vec<_>>>()?;
        let mut cmd: Vec<*const c_char> = c_args.iter().map(|a| a.as_ptr()).collect();

        let mut outbuf: *mut c_char = ptr::null_mut();
        let mut outbuflen: usize = 0;
        let mut outs: *mut c_char = ptr::null_mut();
        let mut outslen: usize = 0;

        tracing::debug!(mds_spec, ?args, input_len = input.len(), "Sending MDS command");
        // SAFETY: live handle; `cmd` holds `cmd.len()` NUL-terminated strings,
        // `input` is readable for its length and the four out-parameters are
        // valid for writes.
        let status = unsafe {
            self.api.mds_command(
                self.raw(),
                c_spec.as_ptr(),
                cmd.as_mut_ptr(),
                cmd.len(),
                input.as_ptr().cast::<c_char>(),
                input.len(),
                &raw mut outbuf,
                &raw mut outbuflen,
                &raw mut outs,
                &raw mut outslen,
            )
        };
        // SAFETY: both buffers were just handed over by the library.
        let data = unsafe { NativeBuffer::from_raw(&*self.api, outbuf, outbuflen) };
        // SAFETY: as above.
        let status_text = unsafe { NativeBuffer::from_raw(&*self.api, outs, outslen) };

        if status < 0 {
            tracing::debug!(status, "MDS command reported failure");
        }
        Ok(MdsCommandOutput {
            status,
            data: data.into_vec(),
            status_text: status_text.into_vec(),
        })
    }
}

impl<A: NativeApi> Drop for CephFs<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<A: NativeApi> fmt::Debug for CephFs<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CephFs")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
