//! Native record layouts and their decoded forms.
//!
//! `ceph_stat` and `ceph_statfs` write raw bytes into caller-provided
//! `struct stat` / `struct statvfs` buffers, so [`RawStat`] and
//! [`RawStatVfs`] must match the C layout exactly. The layout target is
//! 64-bit Linux with glibc (x86_64 and aarch64 share it for these two
//! structs); the compile-time size checks below fail loudly on anything else.
//!
//! The raw structs never leave the crate's API surface unconverted: callers
//! get [`Stat`] and [`StatVfs`], which carry the same values in plain Rust
//! fields.

use serde::Serialize;

/// `struct timespec` on LP64.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Timespec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

/// `struct stat` as filled in by `ceph_stat`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawStat {
    pub st_dev: u64,
    pub st_ino: u64,
    pub st_nlink: u64,
    pub st_mode: u32,
    pub st_uid: u32,
    pub st_gid: u32,
    pub __pad0: i32,
    pub st_rdev: u64,
    pub st_size: i64,
    pub st_blksize: i64,
    pub st_blocks: i64,
    pub st_atim: Timespec,
    pub st_mtim: Timespec,
    pub st_ctim: Timespec,
    pub __unused: [i64; 3],
}

/// `struct statvfs` as filled in by `ceph_statfs`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawStatVfs {
    pub f_bsize: u64,
    pub f_frsize: u64,
    pub f_blocks: u64,
    pub f_bfree: u64,
    pub f_bavail: u64,
    pub f_files: u64,
    pub f_ffree: u64,
    pub f_favail: u64,
    pub f_fsid: u64,
    pub f_flag: u64,
    pub f_namemax: u64,
    pub __f_spare: [i32; 6],
}

const _: () = assert!(std::mem::size_of::<RawStat>() == 144);
const _: () = assert!(std::mem::size_of::<RawStatVfs>() == 112);
const _: () = assert!(std::mem::size_of::<Timespec>() == 16);

/// File metadata returned by [`CephFs::stat`](crate::CephFs::stat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stat {
    pub st_dev: u64,
    pub st_ino: u64,
    pub st_mode: u32,
    pub st_nlink: u64,
    pub st_uid: u32,
    pub st_gid: u32,
    pub st_rdev: u64,
    pub st_size: i64,
    pub st_blksize: i64,
    pub st_blocks: i64,
    pub st_atime: Timespec,
    pub st_mtime: Timespec,
    pub st_ctime: Timespec,
}

impl Stat {
    /// File type bits of `st_mode`.
    pub fn file_type(&self) -> u32 {
        self.st_mode & libc::S_IFMT
    }

    /// Permission bits of `st_mode`, including setuid/setgid/sticky.
    pub fn permissions(&self) -> u32 {
        self.st_mode & 0o7777
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == libc::S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == libc::S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == libc::S_IFLNK
    }
}

impl From<RawStat> for Stat {
    fn from(raw: RawStat) -> Self {
        Self {
            st_dev: raw.st_dev,
            st_ino: raw.st_ino,
            st_mode: raw.st_mode,
            st_nlink: raw.st_nlink,
            st_uid: raw.st_uid,
            st_gid: raw.st_gid,
            st_rdev: raw.st_rdev,
            st_size: raw.st_size,
            st_blksize: raw.st_blksize,
            st_blocks: raw.st_blocks,
            st_atime: raw.st_atim,
            st_mtime: raw.st_mtim,
            st_ctime: raw.st_ctim,
        }
    }
}

impl From<Stat> for RawStat {
    fn from(stat: Stat) -> Self {
        Self {
            st_dev: stat.st_dev,
            st_ino: stat.st_ino,
            st_nlink: stat.st_nlink,
            st_mode: stat.st_mode,
            st_uid: stat.st_uid,
            st_gid: stat.st_gid,
            __pad0: 0,
            st_rdev: stat.st_rdev,
            st_size: stat.st_size,
            st_blksize: stat.st_blksize,
            st_blocks: stat.st_blocks,
            st_atim: stat.st_atime,
            st_mtim: stat.st_mtime,
            st_ctim: stat.st_ctime,
            __unused: [0; 3],
        }
    }
}

/// Filesystem capacity returned by [`CephFs::statfs`](crate::CephFs::statfs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatVfs {
    pub f_bsize: u64,
    pub f_frsize: u64,
    pub f_blocks: u64,
    pub f_bfree: u64,
    pub f_bavail: u64,
    pub f_files: u64,
    pub f_ffree: u64,
    pub f_favail: u64,
    pub f_fsid: u64,
    pub f_flag: u64,
    pub f_namemax: u64,
}

impl StatVfs {
    /// Total capacity in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.f_blocks.saturating_mul(self.f_frsize)
    }

    /// Bytes available to unprivileged users.
    pub fn available_bytes(&self) -> u64 {
        self.f_bavail.saturating_mul(self.f_frsize)
    }
}

impl From<RawStatVfs> for StatVfs {
    fn from(raw: RawStatVfs) -> Self {
        Self {
            f_bsize: raw.f_bsize,
            f_frsize: raw.f_frsize,
            f_blocks: raw.f_blocks,
            f_bfree: raw.f_bfree,
            f_bavail: raw.f_bavail,
            f_files: raw.f_files,
            f_ffree: raw.f_ffree,
            f_favail: raw.f_favail,
            f_fsid: raw.f_fsid,
            f_flag: raw.f_flag,
            f_namemax: raw.f_namemax,
        }
    }
}

impl From<StatVfs> for RawStatVfs {
    fn from(vfs: StatVfs) -> Self {
        Self {
            f_bsize: vfs.f_bsize,
            f_frsize: vfs.f_frsize,
            f_blocks: vfs.f_blocks,
            f_bfree: vfs.f_bfree,
            f_bavail: vfs.f_bavail,
            f_files: vfs.f_files,
            f_ffree: vfs.f_ffree,
            f_favail: vfs.f_favail,
            f_fsid: vfs.f_fsid,
            f_flag: vfs.f_flag,
            f_namemax: vfs.f_namemax,
            __f_spare: [0; 6],
        }
    }
}

/// Version of the loaded libcephfs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
    /// Version string as reported by the library (may be empty).
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_raw_stat_offsets_match_glibc() {
        assert_eq!(offset_of!(RawStat, st_dev), 0);
        assert_eq!(offset_of!(RawStat, st_ino), 8);
        assert_eq!(offset_of!(RawStat, st_nlink), 16);
        assert_eq!(offset_of!(RawStat, st_mode), 24);
        assert_eq!(offset_of!(RawStat, st_uid), 28);
        assert_eq!(offset_of!(RawStat, st_gid), 32);
        assert_eq!(offset_of!(RawStat, __pad0), 36);
        assert_eq!(offset_of!(RawStat, st_rdev), 40);
        assert_eq!(offset_of!(RawStat, st_size), 48);
        assert_eq!(offset_of!(RawStat, st_blksize), 56);
        assert_eq!(offset_of!(RawStat, st_blocks), 64);
        assert_eq!(offset_of!(RawStat, st_atim), 72);
        assert_eq!(offset_of!(RawStat, st_mtim), 88);
        assert_eq!(offset_of!(RawStat, st_ctim), 104);
        assert_eq!(offset_of!(RawStat, __unused), 120);
    }

    #[test]
    fn test_raw_statvfs_offsets_match_glibc() {
        assert_eq!(offset_of!(RawStatVfs, f_bsize), 0);
        assert_eq!(offset_of!(RawStatVfs, f_blocks), 16);
        assert_eq!(offset_of!(RawStatVfs, f_files), 40);
        assert_eq!(offset_of!(RawStatVfs, f_fsid), 64);
        assert_eq!(offset_of!(RawStatVfs, f_flag), 72);
        assert_eq!(offset_of!(RawStatVfs, f_namemax), 80);
        assert_eq!(offset_of!(RawStatVfs, __f_spare), 88);
    }

    #[cfg(all(target_os = "linux", target_env = "gnu", target_pointer_width = "64"))]
    #[test]
    fn test_sizes_match_libc() {
        assert_eq!(
            std::mem::size_of::<RawStat>(),
            std::mem::size_of::<libc::stat>()
        );
        assert_eq!(
            std::mem::size_of::<RawStatVfs>(),
            std::mem::size_of::<libc::statvfs>()
        );
    }

    fn sample_raw() -> RawStat {
        RawStat {
            st_dev: 0x0102_0304_0506_0708,
            st_ino: 1_099_511_627_776,
            st_nlink: 3,
            st_mode: libc::S_IFDIR | 0o755,
            st_uid: 1000,
            st_gid: 100,
            __pad0: 0,
            st_rdev: 7,
            st_size: 4096,
            st_blksize: 4_194_304,
            st_blocks: 8,
            st_atim: Timespec {
                tv_sec: 1_700_000_000,
                tv_nsec: 1,
            },
            st_mtim: Timespec {
                tv_sec: 1_700_000_001,
                tv_nsec: 999_999_999,
            },
            st_ctim: Timespec {
                tv_sec: -1,
                tv_nsec: 500,
            },
            __unused: [0; 3],
        }
    }

    #[test]
    fn test_stat_decode_preserves_fields() {
        let raw = sample_raw();
        let stat = Stat::from(raw);
        assert_eq!(stat.st_dev, raw.st_dev);
        assert_eq!(stat.st_ino, raw.st_ino);
        assert_eq!(stat.st_nlink, 3);
        assert_eq!(stat.st_mode, libc::S_IFDIR | 0o755);
        assert_eq!(stat.st_uid, 1000);
        assert_eq!(stat.st_gid, 100);
        assert_eq!(stat.st_rdev, 7);
        assert_eq!(stat.st_size, 4096);
        assert_eq!(stat.st_blksize, 4_194_304);
        assert_eq!(stat.st_blocks, 8);
        assert_eq!(stat.st_atime, raw.st_atim);
        assert_eq!(stat.st_mtime.tv_nsec, 999_999_999);
        assert_eq!(stat.st_ctime.tv_sec, -1);
        assert_eq!(RawStat::from(stat), raw);
    }

    #[test]
    fn test_stat_decode_from_raw_bytes() {
        // Simulate the native library writing through a byte pointer
        let raw = sample_raw();
        let mut bytes = [0u8; std::mem::size_of::<RawStat>()];
        // SAFETY: RawStat is repr(C) plain data and `bytes` has its exact size.
        unsafe {
            std::ptr::copy_nonoverlapping(
                std::ptr::from_ref(&raw).cast::<u8>(),
                bytes.as_mut_ptr(),
                bytes.len(),
            );
        }
        let mut decoded = RawStat::default();
        // SAFETY: as above, in the other direction.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                std::ptr::from_mut(&mut decoded).cast::<u8>(),
                bytes.len(),
            );
        }
        assert_eq!(Stat::from(decoded), Stat::from(raw));
    }

    #[test]
    fn test_mode_helpers() {
        let stat = Stat::from(sample_raw());
        assert!(stat.is_dir());
        assert!(!stat.is_file());
        assert!(!stat.is_symlink());
        assert_eq!(stat.permissions(), 0o755);

        let file = Stat {
            st_mode: libc::S_IFREG | 0o4644,
            ..stat
        };
        assert!(file.is_file());
        assert_eq!(file.permissions(), 0o4644);
    }

    #[test]
    fn test_statvfs_capacity() {
        let vfs = StatVfs::from(RawStatVfs {
            f_bsize: 4096,
            f_frsize: 1024,
            f_blocks: 1000,
            f_bavail: 250,
            f_namemax: 255,
            ..RawStatVfs::default()
        });
        assert_eq!(vfs.total_bytes(), 1_024_000);
        assert_eq!(vfs.available_bytes(), 256_000);
        assert_eq!(vfs.f_namemax, 255);
    }
}
