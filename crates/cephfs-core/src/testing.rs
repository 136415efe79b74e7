//! In-memory stand-in for libcephfs.
//!
//! [`StubNative`] implements [`NativeApi`] over a tiny in-memory tree so the
//! binding can be exercised without a cluster or the shared library. It
//! follows libcephfs conventions (negative errno returns, library-owned
//! output buffers) and records every entry point invocation, so tests can
//! assert how many native calls an operation made.
//!
//! Failures are injected per entry point with [`StubNative::fail_with`].

use std::collections::{BTreeMap, HashMap};
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr;

use parking_lot::Mutex;

use crate::ffi::{CephMountInfo, NativeApi};
use crate::types::{RawStat, RawStatVfs, Timespec};

/// Timestamp reported for every node.
pub const FIXTURE_TIME: Timespec = Timespec {
    tv_sec: 1_700_000_000,
    tv_nsec: 123_456_789,
};

/// Block size reported by `stat`.
pub const FIXTURE_BLKSIZE: i64 = 4 * 1024 * 1024;

/// Capacity reported by `statfs`.
pub const FIXTURE_STATVFS: RawStatVfs = RawStatVfs {
    f_bsize: 4 * 1024 * 1024,
    f_frsize: 4 * 1024 * 1024,
    f_blocks: 1024,
    f_bfree: 768,
    f_bavail: 768,
    f_files: 42,
    f_ffree: u64::MAX - 42,
    f_favail: u64::MAX - 42,
    f_fsid: 0xcef5,
    f_flag: 0,
    f_namemax: 255,
    __f_spare: [0; 6],
};

const VERSION_MAJOR: c_int = 17;
const VERSION_MINOR: c_int = 2;
const VERSION_PATCH: c_int = 6;
const VERSION_TEXT: &CStr = c"17.2.6-stub";

/// Reply returned by the stub's `ceph_mds_command`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MdsResponse {
    pub status: c_int,
    pub data: Option<Vec<u8>>,
    pub status_text: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct Node {
    mode: u32,
    ino: u64,
    size: i64,
    xattrs: HashMap<String, Vec<u8>>,
}

impl Node {
    fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT == libc::S_IFDIR
    }
}

struct Session {
    // Heap anchor whose address is the handle given to the caller
    anchor: Box<u8>,
    conf: HashMap<String, String>,
    initialized: bool,
    mounted: bool,
    cwd: CString,
    nodes: BTreeMap<String, Node>,
    fds: HashMap<c_int, String>,
    next_fd: c_int,
    next_ino: u64,
}

impl Session {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                mode: libc::S_IFDIR | 0o755,
                ino: 1,
                size: 0,
                xattrs: HashMap::new(),
            },
        );
        Self {
            anchor: Box::new(0),
            conf: HashMap::new(),
            initialized: false,
            mounted: false,
            cwd: c"/".to_owned(),
            nodes,
            fds: HashMap::new(),
            next_fd: 1,
            next_ino: 2,
        }
    }

    fn resolve(&self, path: &str) -> String {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{path}", self.cwd.to_string_lossy())
        };
        let parts: Vec<&str> = joined
            .split('/')
            .filter(|p| !p.is_empty() && *p != ".")
            .collect();
        format!("/{}", parts.join("/"))
    }

    fn parent_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &path[..idx],
        }
    }

    fn create_node(&mut self, path: &str, mode: u32) -> c_int {
        if self.nodes.contains_key(path) {
            return -libc::EEXIST;
        }
        match self.nodes.get(Self::parent_of(path)) {
            None => return -libc::ENOENT,
            Some(parent) if !parent.is_dir() => return -libc::ENOTDIR,
            Some(_) => {}
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.nodes.insert(
            path.to_string(),
            Node {
                mode,
                ino,
                size: 0,
                xattrs: HashMap::new(),
            },
        );
        0
    }
}

#[derive(Default)]
struct StubState {
    sessions: HashMap<usize, Session>,
    buffers: HashMap<usize, Box<[u8]>>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, c_int>,
    conf_history: Vec<(String, String)>,
    mds_response: MdsResponse,
}

/// In-memory [`NativeApi`] with call counting and fault injection.
#[derive(Default)]
pub struct StubNative {
    state: Mutex<StubState>,
}

impl StubNative {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the C entry point `name` (e.g. `"ceph_mount"`) was called.
    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().calls.get(name).copied().unwrap_or(0)
    }

    /// Total native calls across all entry points.
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    /// Makes every later call to `name` return `code` without side effects.
    pub fn fail_with(&self, name: &'static str, code: c_int) {
        self.state.lock().failures.insert(name, code);
    }

    /// Removes an injected failure.
    pub fn clear_failure(&self, name: &str) {
        self.state.lock().failures.remove(name);
    }

    /// Sets the reply for subsequent `ceph_mds_command` calls.
    pub fn set_mds_response(&self, response: MdsResponse) {
        self.state.lock().mds_response = response;
    }

    /// Every `(option, value)` accepted by `ceph_conf_set`, in call order.
    pub fn conf_history(&self) -> Vec<(String, String)> {
        self.state.lock().conf_history.clone()
    }

    /// Mount handles created and not yet shut down.
    pub fn live_handles(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Output buffers handed out and not yet freed.
    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    /// Allocates a library-owned buffer holding `bytes`.
    ///
    /// The pointer is never null, even for empty input, and must be released
    /// with [`NativeApi::buffer_free`].
    pub fn alloc_buffer(&self, bytes: &[u8]) -> *mut c_char {
        Self::alloc_locked(&mut self.state.lock(), bytes)
    }

    fn alloc_locked(state: &mut StubState, bytes: &[u8]) -> *mut c_char {
        let mut storage = vec![0u8; bytes.len().max(1)].into_boxed_slice();
        storage[..bytes.len()].copy_from_slice(bytes);
        let ptr = storage.as_mut_ptr();
        state.buffers.insert(ptr as usize, storage);
        ptr.cast::<c_char>()
    }

    /// Counts the call and returns the injected failure, if any.
    fn enter(state: &mut StubState, name: &'static str) -> Option<c_int> {
        *state.calls.entry(name).or_default() += 1;
        state.failures.get(name).copied()
    }

    fn session(state: &mut StubState, cmount: *mut CephMountInfo) -> Option<&mut Session> {
        state.sessions.get_mut(&(cmount as usize))
    }
}

/// Reads a C string argument.
///
/// # Safety
///
/// `ptr` must be null or NUL-terminated.
unsafe fn arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: guaranteed by the caller.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

macro_rules! enter {
    ($state:ident, $name:literal) => {
        if let Some(code) = StubNative::enter(&mut $state, $name) {
            return code;
        }
    };
}

macro_rules! mounted_session {
    ($state:ident, $cmount:ident) => {
        match StubNative::session(&mut $state, $cmount) {
            Some(session) if session.mounted => session,
            Some(_) => return -libc::ENOTCONN,
            None => return -libc::EBADF,
        }
    };
}

impl NativeApi for StubNative {
    unsafe fn create(&self, cmount: *mut *mut CephMountInfo, _id: *const c_char) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_create");
        let mut session = Session::new();
        let handle = ptr::from_mut(session.anchor.as_mut()).cast::<CephMountInfo>();
        state.sessions.insert(handle as usize, session);
        // SAFETY: the caller passes a writable out-parameter.
        unsafe { *cmount = handle };
        0
    }

    unsafe fn shutdown(&self, cmount: *mut CephMountInfo) {
        let mut state = self.state.lock();
        *state.calls.entry("ceph_shutdown").or_default() += 1;
        state.sessions.remove(&(cmount as usize));
    }

    unsafe fn init(&self, cmount: *mut CephMountInfo) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_init");
        match Self::session(&mut state, cmount) {
            Some(session) => {
                session.initialized = true;
                0
            }
            None => -libc::EBADF,
        }
    }

    unsafe fn mount(&self, cmount: *mut CephMountInfo, root: *const c_char) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_mount");
        // SAFETY: NUL-terminated per the trait contract.
        let root = unsafe { arg(root) }.unwrap_or_else(|| "/".to_string());
        let Some(session) = Self::session(&mut state, cmount) else {
            return -libc::EBADF;
        };
        if session.mounted {
            return -libc::EISCONN;
        }
        if !session.nodes.contains_key(&session.resolve(&root)) {
            return -libc::ENOENT;
        }
        session.initialized = true;
        session.mounted = true;
        0
    }

    unsafe fn conf_read_file(
        &self,
        cmount: *mut CephMountInfo,
        path_list: *const c_char,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_conf_read_file");
        if Self::session(&mut state, cmount).is_none() {
            return -libc::EBADF;
        }
        // SAFETY: NUL-terminated per the trait contract.
        match unsafe { arg(path_list) } {
            None => 0,
            Some(list) if list.split(',').any(|p| std::path::Path::new(p).is_file()) => 0,
            Some(_) => -libc::ENOENT,
        }
    }

    unsafe fn conf_parse_argv(
        &self,
        cmount: *mut CephMountInfo,
        argc: c_int,
        argv: *mut *const c_char,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_conf_parse_argv");
        let Ok(argc) = usize::try_from(argc) else {
            return -libc::EINVAL;
        };
        let args: Vec<String> = (0..argc)
            // SAFETY: `argv` holds `argc` NUL-terminated strings.
            .filter_map(|i| unsafe { arg(*argv.add(i)) })
            .collect();
        let Some(session) = Self::session(&mut state, cmount) else {
            return -libc::EBADF;
        };
        // argv[0] is the program name
        let mut iter = args.iter().skip(1).peekable();
        while let Some(current) = iter.next() {
            let Some(option) = current.strip_prefix("--") else {
                continue;
            };
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name.to_string(), value.to_string()),
                None => match iter.next_if(|next| !next.starts_with("--")) {
                    Some(value) => (option.to_string(), value.clone()),
                    None => (option.to_string(), "true".to_string()),
                },
            };
            session.conf.insert(name.replace('-', "_"), value);
        }
        0
    }

    unsafe fn conf_get(
        &self,
        cmount: *mut CephMountInfo,
        option: *const c_char,
        buf: *mut c_char,
        len: usize,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_conf_get");
        // SAFETY: NUL-terminated per the trait contract.
        let option = unsafe { arg(option) }.unwrap_or_default();
        let Some(session) = Self::session(&mut state, cmount) else {
            return -libc::EBADF;
        };
        let Some(value) = session.conf.get(&option) else {
            return -libc::ENOENT;
        };
        let bytes = value.as_bytes();
        if bytes.len() >= len {
            return -libc::ENAMETOOLONG;
        }
        // SAFETY: `buf` has room for `len` bytes and `bytes.len() + 1 <= len`.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len());
            *buf.add(bytes.len()) = 0;
        }
        0
    }

    unsafe fn conf_set(
        &self,
        cmount: *mut CephMountInfo,
        option: *const c_char,
        value: *const c_char,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_conf_set");
        // SAFETY: NUL-terminated per the trait contract.
        let (option, value) = unsafe { (arg(option), arg(value)) };
        let (Some(option), Some(value)) = (option, value) else {
            return -libc::EINVAL;
        };
        if option.is_empty() {
            return -libc::ENOENT;
        }
        let Some(session) = Self::session(&mut state, cmount) else {
            return -libc::EBADF;
        };
        session.conf.insert(option.clone(), value.clone());
        state.conf_history.push((option, value));
        0
    }

    unsafe fn statfs(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        stbuf: *mut RawStatVfs,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_statfs");
        // SAFETY: NUL-terminated per the trait contract.
        let path = unsafe { arg(path) }.unwrap_or_default();
        let session = mounted_session!(state, cmount);
        if !session.nodes.contains_key(&session.resolve(&path)) {
            return -libc::ENOENT;
        }
        // SAFETY: `stbuf` points to a writable statvfs record.
        unsafe { stbuf.write(FIXTURE_STATVFS) };
        0
    }

    unsafe fn sync_fs(&self, cmount: *mut CephMountInfo) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_sync_fs");
        let _session = mounted_session!(state, cmount);
        0
    }

    unsafe fn getcwd(&self, cmount: *mut CephMountInfo) -> *const c_char {
        let mut state = self.state.lock();
        *state.calls.entry("ceph_getcwd").or_default() += 1;
        if state.failures.contains_key("ceph_getcwd") {
            return ptr::null();
        }
        match Self::session(&mut state, cmount) {
            // The CString's heap data stays put until the next chdir
            Some(session) => session.cwd.as_ptr(),
            None => ptr::null(),
        }
    }

    unsafe fn chdir(&self, cmount: *mut CephMountInfo, path: *const c_char) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_chdir");
        // SAFETY: NUL-terminated per the trait contract.
        let path = unsafe { arg(path) }.unwrap_or_default();
        let session = mounted_session!(state, cmount);
        let resolved = session.resolve(&path);
        match session.nodes.get(&resolved) {
            None => -libc::ENOENT,
            Some(node) if !node.is_dir() => -libc::ENOTDIR,
            Some(_) => match CString::new(resolved) {
                Ok(cwd) => {
                    session.cwd = cwd;
                    0
                }
                Err(_) => -libc::EINVAL,
            },
        }
    }

    unsafe fn mkdir(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        mode: libc::mode_t,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_mkdir");
        // SAFETY: NUL-terminated per the trait contract.
        let path = unsafe { arg(path) }.unwrap_or_default();
        let session = mounted_session!(state, cmount);
        let resolved = session.resolve(&path);
        session.create_node(&resolved, libc::S_IFDIR | (mode & 0o7777))
    }

    unsafe fn mkdirs(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        mode: libc::mode_t,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_mkdirs");
        // SAFETY: NUL-terminated per the trait contract.
        let path = unsafe { arg(path) }.unwrap_or_default();
        let session = mounted_session!(state, cmount);
        let resolved = session.resolve(&path);
        if session.nodes.contains_key(&resolved) {
            return -libc::EEXIST;
        }
        let mut prefix = String::new();
        for part in resolved.split('/').filter(|p| !p.is_empty()) {
            prefix.push('/');
            prefix.push_str(part);
            match session.nodes.get(&prefix) {
                Some(node) if node.is_dir() => {}
                Some(_) => return -libc::ENOTDIR,
                None => {
                    let ret = session.create_node(&prefix, libc::S_IFDIR | (mode & 0o7777));
                    if ret != 0 {
                        return ret;
                    }
                }
            }
        }
        0
    }

    unsafe fn open(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        flags: c_int,
        mode: libc::mode_t,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_open");
        // SAFETY: NUL-terminated per the trait contract.
        let path = unsafe { arg(path) }.unwrap_or_default();
        let session = mounted_session!(state, cmount);
        let resolved = session.resolve(&path);
        let existing = session.nodes.get(&resolved).map(Node::is_dir);
        match existing {
            Some(_) if flags & libc::O_CREAT != 0 && flags & libc::O_EXCL != 0 => {
                return -libc::EEXIST;
            }
            Some(true) if flags & libc::O_ACCMODE != libc::O_RDONLY => return -libc::EISDIR,
            Some(_) => {
                if flags & libc::O_TRUNC != 0 {
                    if let Some(node) = session.nodes.get_mut(&resolved) {
                        node.size = 0;
                    }
                }
            }
            None if flags & libc::O_CREAT != 0 => {
                let ret = session.create_node(&resolved, libc::S_IFREG | (mode & 0o7777));
                if ret != 0 {
                    return ret;
                }
            }
            None => return -libc::ENOENT,
        }
        let fd = session.next_fd;
        session.next_fd += 1;
        session.fds.insert(fd, resolved);
        fd
    }

    unsafe fn close(&self, cmount: *mut CephMountInfo, fd: c_int) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_close");
        let session = mounted_session!(state, cmount);
        match session.fds.remove(&fd) {
            Some(_) => 0,
            None => -libc::EBADF,
        }
    }

    unsafe fn setxattr(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        name: *const c_char,
        value: *const c_void,
        size: usize,
        flags: c_int,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_setxattr");
        // SAFETY: NUL-terminated per the trait contract.
        let (path, name) = unsafe { (arg(path).unwrap_or_default(), arg(name).unwrap_or_default()) };
        let bytes = if size == 0 {
            Vec::new()
        } else {
            // SAFETY: `value` points to `size` readable bytes.
            unsafe { std::slice::from_raw_parts(value.cast::<u8>(), size) }.to_vec()
        };
        let session = mounted_session!(state, cmount);
        let resolved = session.resolve(&path);
        let Some(node) = session.nodes.get_mut(&resolved) else {
            return -libc::ENOENT;
        };
        let exists = node.xattrs.contains_key(&name);
        if flags & libc::XATTR_CREATE != 0 && exists {
            return -libc::EEXIST;
        }
        if flags & libc::XATTR_REPLACE != 0 && !exists {
            return -libc::ENODATA;
        }
        node.xattrs.insert(name, bytes);
        0
    }

    unsafe fn stat(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        stbuf: *mut RawStat,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_stat");
        // SAFETY: NUL-terminated per the trait contract.
        let path = unsafe { arg(path) }.unwrap_or_default();
        let session = mounted_session!(state, cmount);
        let Some(node) = session.nodes.get(&session.resolve(&path)) else {
            return -libc::ENOENT;
        };
        let raw = RawStat {
            st_dev: 0xcef5,
            st_ino: node.ino,
            st_nlink: if node.is_dir() { 2 } else { 1 },
            st_mode: node.mode,
            st_uid: 0,
            st_gid: 0,
            __pad0: 0,
            st_rdev: 0,
            st_size: node.size,
            st_blksize: FIXTURE_BLKSIZE,
            st_blocks: (node.size + 511) / 512,
            st_atim: FIXTURE_TIME,
            st_mtim: FIXTURE_TIME,
            st_ctim: FIXTURE_TIME,
            __unused: [0; 3],
        };
        // SAFETY: `stbuf` points to a writable stat record.
        unsafe { stbuf.write(raw) };
        0
    }

    unsafe fn unlink(&self, cmount: *mut CephMountInfo, path: *const c_char) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_unlink");
        // SAFETY: NUL-terminated per the trait contract.
        let path = unsafe { arg(path) }.unwrap_or_default();
        let session = mounted_session!(state, cmount);
        let resolved = session.resolve(&path);
        match session.nodes.get(&resolved) {
            None => -libc::ENOENT,
            Some(node) if node.is_dir() => -libc::EISDIR,
            Some(_) => {
                session.nodes.remove(&resolved);
                0
            }
        }
    }

    unsafe fn mds_command(
        &self,
        cmount: *mut CephMountInfo,
        _mds_spec: *const c_char,
        _cmd: *mut *const c_char,
        _cmdlen: usize,
        _inbuf: *const c_char,
        _inbuflen: usize,
        outbuf: *mut *mut c_char,
        outbuflen: *mut usize,
        outs: *mut *mut c_char,
        outslen: *mut usize,
    ) -> c_int {
        let mut state = self.state.lock();
        enter!(state, "ceph_mds_command");
        if Self::session(&mut state, cmount).is_none() {
            return -libc::EBADF;
        }
        let response = state.mds_response.clone();
        let mut emit = |bytes: Option<&[u8]>, buf: *mut *mut c_char, len: *mut usize| {
            let (ptr, n) = match bytes {
                Some(bytes) => (Self::alloc_locked(&mut state, bytes), bytes.len()),
                None => (ptr::null_mut(), 0),
            };
            // SAFETY: the caller passes writable out-parameters.
            unsafe {
                *buf = ptr;
                *len = n;
            }
        };
        emit(response.data.as_deref(), outbuf, outbuflen);
        emit(response.status_text.as_deref(), outs, outslen);
        response.status
    }

    unsafe fn buffer_free(&self, buf: *mut c_char) {
        let mut state = self.state.lock();
        *state.calls.entry("ceph_buffer_free").or_default() += 1;
        let released = state.buffers.remove(&(buf as usize));
        assert!(released.is_some(), "ceph_buffer_free on unknown buffer");
    }

    unsafe fn version(
        &self,
        major: *mut c_int,
        minor: *mut c_int,
        patch: *mut c_int,
    ) -> *const c_char {
        let mut state = self.state.lock();
        *state.calls.entry("ceph_version").or_default() += 1;
        // SAFETY: the caller passes writable out-parameters.
        unsafe {
            *major = VERSION_MAJOR;
            *minor = VERSION_MINOR;
            *patch = VERSION_PATCH;
        }
        VERSION_TEXT.as_ptr()
    }
}
