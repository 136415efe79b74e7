use comfy_table::Table;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;

use cephfs_core::Timespec;

/// Create a styled table for output
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// Format a byte size into a human-readable string
#[allow(clippy::cast_precision_loss)] // Display only
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    match bytes {
        b if b >= TB => format!("{:.1}T", b as f64 / TB as f64),
        b if b >= GB => format!("{:.1}G", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1}M", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1}K", b as f64 / KB as f64),
        b => format!("{b}B"),
    }
}

/// Format `st_mode` the way `ls -l` does (`drwxr-xr-x`).
pub fn format_mode(mode: u32) -> String {
    let kind = match mode & libc::S_IFMT {
        libc::S_IFDIR => 'd',
        libc::S_IFLNK => 'l',
        libc::S_IFCHR => 'c',
        libc::S_IFBLK => 'b',
        libc::S_IFIFO => 'p',
        libc::S_IFSOCK => 's',
        _ => '-',
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// Format a timestamp as `seconds.nanoseconds` since the epoch.
pub fn format_timespec(ts: Timespec) -> String {
    format!("{}.{:09}", ts.tv_sec, ts.tv_nsec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1536), "1.5K");
        assert_eq!(format_size(4 * 1024 * 1024), "4.0M");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 * 1024), "3.0T");
    }

    #[test]
    fn test_format_mode() {
        assert_eq!(format_mode(libc::S_IFDIR | 0o755), "drwxr-xr-x");
        assert_eq!(format_mode(libc::S_IFREG | 0o640), "-rw-r-----");
        assert_eq!(format_mode(libc::S_IFLNK | 0o777), "lrwxrwxrwx");
    }

    #[test]
    fn test_format_timespec() {
        let ts = Timespec {
            tv_sec: 1_700_000_000,
            tv_nsec: 5,
        };
        assert_eq!(format_timespec(ts), "1700000000.000000005");
    }
}
