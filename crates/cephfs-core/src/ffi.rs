//! The native libcephfs interface.
//!
//! [`NativeApi`] lists every libcephfs entry point the binding uses, with the
//! exact C parameter order. [`LibCephFs`] implements it by resolving all
//! symbols from a loaded shared library up front: a library missing any of
//! them is rejected at load time instead of failing on first use.
//!
//! Nothing here validates arguments or interprets return codes; that is the
//! job of [`CephFs`](crate::CephFs).

use std::ffi::{c_char, c_int, c_void};
use std::fmt;
use std::path::Path;

use libloading::Library;

use crate::error::{Error, Result};
use crate::types::{RawStat, RawStatVfs};

/// Opaque `struct ceph_mount_info`.
#[repr(C)]
pub struct CephMountInfo {
    _private: [u8; 0],
}

pub type CreateFn = unsafe extern "C" fn(*mut *mut CephMountInfo, *const c_char) -> c_int;
pub type ShutdownFn = unsafe extern "C" fn(*mut CephMountInfo);
pub type HandleFn = unsafe extern "C" fn(*mut CephMountInfo) -> c_int;
pub type PathFn = unsafe extern "C" fn(*mut CephMountInfo, *const c_char) -> c_int;
pub type ParseArgvFn = unsafe extern "C" fn(*mut CephMountInfo, c_int, *mut *const c_char) -> c_int;
pub type ConfGetFn =
    unsafe extern "C" fn(*mut CephMountInfo, *const c_char, *mut c_char, usize) -> c_int;
pub type ConfSetFn = unsafe extern "C" fn(*mut CephMountInfo, *const c_char, *const c_char) -> c_int;
pub type StatfsFn = unsafe extern "C" fn(*mut CephMountInfo, *const c_char, *mut RawStatVfs) -> c_int;
pub type GetcwdFn = unsafe extern "C" fn(*mut CephMountInfo) -> *const c_char;
pub type MkdirFn = unsafe extern "C" fn(*mut CephMountInfo, *const c_char, libc::mode_t) -> c_int;
pub type OpenFn =
    unsafe extern "C" fn(*mut CephMountInfo, *const c_char, c_int, libc::mode_t) -> c_int;
pub type CloseFn = unsafe extern "C" fn(*mut CephMountInfo, c_int) -> c_int;
pub type SetxattrFn = unsafe extern "C" fn(
    *mut CephMountInfo,
    *const c_char,
    *const c_char,
    *const c_void,
    usize,
    c_int,
) -> c_int;
pub type StatFn = unsafe extern "C" fn(*mut CephMountInfo, *const c_char, *mut RawStat) -> c_int;
pub type MdsCommandFn = unsafe extern "C" fn(
    *mut CephMountInfo,
    *const c_char,
    *mut *const c_char,
    usize,
    *const c_char,
    usize,
    *mut *mut c_char,
    *mut usize,
    *mut *mut c_char,
    *mut usize,
) -> c_int;
pub type BufferFreeFn = unsafe extern "C" fn(*mut c_char);
pub type VersionFn = unsafe extern "C" fn(*mut c_int, *mut c_int, *mut c_int) -> *const c_char;

/// The libcephfs entry points used by the binding.
///
/// Each method mirrors one C function of `libcephfs.h`. Implementations must
/// behave like libcephfs: return codes follow its conventions and every
/// pointer written through an out-parameter obeys its ownership rules.
///
/// # Safety
///
/// All methods are `unsafe`: callers must pass a live mount handle created by
/// [`NativeApi::create`] of the same implementation, NUL-terminated strings,
/// and buffers large enough for what the C contract writes.
pub trait NativeApi: Send + Sync {
    unsafe fn create(&self, cmount: *mut *mut CephMountInfo, id: *const c_char) -> c_int;

    /// Unmounts if needed and releases the handle. The handle is dead after
    /// this returns.
    unsafe fn shutdown(&self, cmount: *mut CephMountInfo);

    unsafe fn init(&self, cmount: *mut CephMountInfo) -> c_int;

    unsafe fn mount(&self, cmount: *mut CephMountInfo, root: *const c_char) -> c_int;

    /// A null `path_list` reads the default search path.
    unsafe fn conf_read_file(&self, cmount: *mut CephMountInfo, path_list: *const c_char)
    -> c_int;

    unsafe fn conf_parse_argv(
        &self,
        cmount: *mut CephMountInfo,
        argc: c_int,
        argv: *mut *const c_char,
    ) -> c_int;

    /// Returns `-ENAMETOOLONG` when `buf` is too small for the value.
    unsafe fn conf_get(
        &self,
        cmount: *mut CephMountInfo,
        option: *const c_char,
        buf: *mut c_char,
        len: usize,
    ) -> c_int;

    unsafe fn conf_set(
        &self,
        cmount: *mut CephMountInfo,
        option: *const c_char,
        value: *const c_char,
    ) -> c_int;

    unsafe fn statfs(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        stbuf: *mut RawStatVfs,
    ) -> c_int;

    unsafe fn sync_fs(&self, cmount: *mut CephMountInfo) -> c_int;

    /// The returned string is owned by the mount handle.
    unsafe fn getcwd(&self, cmount: *mut CephMountInfo) -> *const c_char;

    unsafe fn chdir(&self, cmount: *mut CephMountInfo, path: *const c_char) -> c_int;

    unsafe fn mkdir(&self, cmount: *mut CephMountInfo, path: *const c_char, mode: libc::mode_t)
    -> c_int;

    unsafe fn mkdirs(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        mode: libc::mode_t,
    ) -> c_int;

    /// Returns a descriptor (>= 0) or a negative errno.
    unsafe fn open(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        flags: c_int,
        mode: libc::mode_t,
    ) -> c_int;

    unsafe fn close(&self, cmount: *mut CephMountInfo, fd: c_int) -> c_int;

    unsafe fn setxattr(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        name: *const c_char,
        value: *const c_void,
        size: usize,
        flags: c_int,
    ) -> c_int;

    unsafe fn stat(&self, cmount: *mut CephMountInfo, path: *const c_char, stbuf: *mut RawStat)
    -> c_int;

    unsafe fn unlink(&self, cmount: *mut CephMountInfo, path: *const c_char) -> c_int;

    /// Both output buffers are allocated by the library and must be released
    /// with [`NativeApi::buffer_free`].
    #[allow(clippy::too_many_arguments)]
    unsafe fn mds_command(
        &self,
        cmount: *mut CephMountInfo,
        mds_spec: *const c_char,
        cmd: *mut *const c_char,
        cmdlen: usize,
        inbuf: *const c_char,
        inbuflen: usize,
        outbuf: *mut *mut c_char,
        outbuflen: *mut usize,
        outs: *mut *mut c_char,
        outslen: *mut usize,
    ) -> c_int;

    unsafe fn buffer_free(&self, buf: *mut c_char);

    /// The returned string is static.
    unsafe fn version(&self, major: *mut c_int, minor: *mut c_int, patch: *mut c_int)
    -> *const c_char;
}

/// libcephfs bound through `libloading`.
///
/// The function pointers stay valid for as long as `_library` is alive, which
/// is the lifetime of this struct.
pub struct LibCephFs {
    create: CreateFn,
    shutdown: ShutdownFn,
    init: HandleFn,
    mount: PathFn,
    conf_read_file: PathFn,
    conf_parse_argv: ParseArgvFn,
    conf_get: ConfGetFn,
    conf_set: ConfSetFn,
    statfs: StatfsFn,
    sync_fs: HandleFn,
    getcwd: GetcwdFn,
    chdir: PathFn,
    mkdir: MkdirFn,
    mkdirs: MkdirFn,
    open: OpenFn,
    close: CloseFn,
    setxattr: SetxattrFn,
    stat: StatFn,
    unlink: PathFn,
    mds_command: MdsCommandFn,
    buffer_free: BufferFreeFn,
    version: VersionFn,
    _library: Library,
}

impl fmt::Debug for LibCephFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibCephFs").finish_non_exhaustive()
    }
}

/// Resolves one symbol, copying the function pointer out of the `Symbol`.
fn bind<T: Copy>(library: &Library, name: &str) -> Result<T> {
    // SAFETY: the caller picks `T` to match the C prototype of `name`.
    unsafe {
        library
            .get::<T>(name.as_bytes())
            .map(|symbol| *symbol)
            .map_err(|e| Error::Environment(format!("missing symbol {name}: {e}")))
    }
}

impl LibCephFs {
    /// Loads libcephfs from an explicit file name or path.
    ///
    /// Bare file names go through the dynamic linker search path. This does
    /// not touch the process-wide cache used by [`crate::loader::load`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // SAFETY: loading runs the library's initialisers; libcephfs has no
        // requirements on them beyond being loaded once per handle.
        let library = unsafe { Library::new(path) }
            .map_err(|e| Error::Environment(format!("{}: {e}", path.display())))?;
        Self::from_library(library)
    }

    /// Binds every entry point from an already loaded library.
    pub fn from_library(library: Library) -> Result<Self> {
        Ok(Self {
            create: bind(&library, "ceph_create")?,
            shutdown: bind(&library, "ceph_shutdown")?,
            init: bind(&library, "ceph_init")?,
            mount: bind(&library, "ceph_mount")?,
            conf_read_file: bind(&library, "ceph_conf_read_file")?,
            conf_parse_argv: bind(&library, "ceph_conf_parse_argv")?,
            conf_get: bind(&library, "ceph_conf_get")?,
            conf_set: bind(&library, "ceph_conf_set")?,
            statfs: bind(&library, "ceph_statfs")?,
            sync_fs: bind(&library, "ceph_sync_fs")?,
            getcwd: bind(&library, "ceph_getcwd")?,
            chdir: bind(&library, "ceph_chdir")?,
            mkdir: bind(&library, "ceph_mkdir")?,
            mkdirs: bind(&library, "ceph_mkdirs")?,
            open: bind(&library, "ceph_open")?,
            close: bind(&library, "ceph_close")?,
            setxattr: bind(&library, "ceph_setxattr")?,
            stat: bind(&library, "ceph_stat")?,
            unlink: bind(&library, "ceph_unlink")?,
            mds_command: bind(&library, "ceph_mds_command")?,
            buffer_free: bind(&library, "ceph_buffer_free")?,
            version: bind(&library, "ceph_version")?,
            _library: library,
        })
    }
}

// Each method forwards to the C function unchanged; the caller upholds the
// contract documented on the trait.
impl NativeApi for LibCephFs {
    unsafe fn create(&self, cmount: *mut *mut CephMountInfo, id: *const c_char) -> c_int {
        unsafe { (self.create)(cmount, id) }
    }

    unsafe fn shutdown(&self, cmount: *mut CephMountInfo) {
        unsafe { (self.shutdown)(cmount) }
    }

    unsafe fn init(&self, cmount: *mut CephMountInfo) -> c_int {
        unsafe { (self.init)(cmount) }
    }

    unsafe fn mount(&self, cmount: *mut CephMountInfo, root: *const c_char) -> c_int {
        unsafe { (self.mount)(cmount, root) }
    }

    unsafe fn conf_read_file(
        &self,
        cmount: *mut CephMountInfo,
        path_list: *const c_char,
    ) -> c_int {
        unsafe { (self.conf_read_file)(cmount, path_list) }
    }

    unsafe fn conf_parse_argv(
        &self,
        cmount: *mut CephMountInfo,
        argc: c_int,
        argv: *mut *const c_char,
    ) -> c_int {
        unsafe { (self.conf_parse_argv)(cmount, argc, argv) }
    }

    unsafe fn conf_get(
        &self,
        cmount: *mut CephMountInfo,
        option: *const c_char,
        buf: *mut c_char,
        len: usize,
    ) -> c_int {
        unsafe { (self.conf_get)(cmount, option, buf, len) }
    }

    unsafe fn conf_set(
        &self,
        cmount: *mut CephMountInfo,
        option: *const c_char,
        value: *const c_char,
    ) -> c_int {
        unsafe { (self.conf_set)(cmount, option, value) }
    }

    unsafe fn statfs(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        stbuf: *mut RawStatVfs,
    ) -> c_int {
        unsafe { (self.statfs)(cmount, path, stbuf) }
    }

    unsafe fn sync_fs(&self, cmount: *mut CephMountInfo) -> c_int {
        unsafe { (self.sync_fs)(cmount) }
    }

    unsafe fn getcwd(&self, cmount: *mut CephMountInfo) -> *const c_char {
        unsafe { (self.getcwd)(cmount) }
    }

    unsafe fn chdir(&self, cmount: *mut CephMountInfo, path: *const c_char) -> c_int {
        unsafe { (self.chdir)(cmount, path) }
    }

    unsafe fn mkdir(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        mode: libc::mode_t,
    ) -> c_int {
        unsafe { (self.mkdir)(cmount, path, mode) }
    }

    unsafe fn mkdirs(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        mode: libc::mode_t,
    ) -> c_int {
        unsafe { (self.mkdirs)(cmount, path, mode) }
    }

    unsafe fn open(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        flags: c_int,
        mode: libc::mode_t,
    ) -> c_int {
        unsafe { (self.open)(cmount, path, flags, mode) }
    }

    unsafe fn close(&self, cmount: *mut CephMountInfo, fd: c_int) -> c_int {
        unsafe { (self.close)(cmount, fd) }
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
        unsafe { (self.setxattr)(cmount, path, name, value, size, flags) }
    }

    unsafe fn stat(
        &self,
        cmount: *mut CephMountInfo,
        path: *const c_char,
        stbuf: *mut RawStat,
    ) -> c_int {
        unsafe { (self.stat)(cmount, path, stbuf) }
    }

    unsafe fn unlink(&self, cmount: *mut CephMountInfo, path: *const c_char) -> c_int {
        unsafe { (self.unlink)(cmount, path) }
    }

    unsafe fn mds_command(
        &self,
        cmount: *mut CephMountInfo,
        mds_spec: *const c_char,
        cmd: *mut *const c_char,
        cmdlen: usize,
        inbuf: *const c_char,
        inbuflen: usize,
        outbuf: *mut *mut c_char,
        outbuflen: *mut usize,
        outs: *mut *mut c_char,
        outslen: *mut usize,
    ) -> c_int {
        unsafe {
            (self.mds_command)(
                cmount, mds_spec, cmd, cmdlen, inbuf, inbuflen, outbuf, outbuflen, outs, outslen,
            )
        }
    }

    unsafe fn buffer_free(&self, buf: *mut c_char) {
        unsafe { (self.buffer_free)(buf) }
    }

    unsafe fn version(
        &self,
        major: *mut c_int,
        minor: *mut c_int,
        patch: *mut c_int,
    ) -> *const c_char {
        unsafe { (self.version)(major, minor, patch) }
    }
}
