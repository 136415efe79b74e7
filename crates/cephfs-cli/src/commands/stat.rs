//! Stat command - show metadata for a file or directory.
//!
//! # Examples
//!
//! ```bash
//! cephfs stat /volumes
//! cephfs stat --json /volumes | jq .st_mode
//! ```

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use comfy_table::Table;
use tracing::instrument;

use cephfs_core::{CephFs, NativeApi, Stat};

use super::normalize_path;
use crate::output::{create_table, format_mode, format_size, format_timespec};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Path to inspect
    pub path: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::stat", skip_all, fields(path = %args.path))]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let path = normalize_path(&args.path);
    let stat = fs
        .stat(&path)
        .with_context(|| format!("Failed to stat {path}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stat)?);
    } else {
        println!("{}", render(&path, &stat));
    }
    Ok(())
}

fn render(path: &str, stat: &Stat) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec!["Path", path]);
    table.add_row(vec![
        "Mode".to_string(),
        format!("{} ({:04o})", format_mode(stat.st_mode), stat.permissions()),
    ]);
    table.add_row(vec!["Inode".to_string(), stat.st_ino.to_string()]);
    table.add_row(vec!["Links".to_string(), stat.st_nlink.to_string()]);
    table.add_row(vec![
        "Owner".to_string(),
        format!("{}:{}", stat.st_uid, stat.st_gid),
    ]);
    table.add_row(vec![
        "Size".to_string(),
        format!(
            "{} ({})",
            stat.st_size,
            format_size(u64::try_from(stat.st_size).unwrap_or(0))
        ),
    ]);
    table.add_row(vec!["Blocks".to_string(), stat.st_blocks.to_string()]);
    table.add_row(vec!["Block size".to_string(), stat.st_blksize.to_string()]);
    table.add_row(vec!["Access".to_string(), format_timespec(stat.st_atime)]);
    table.add_row(vec!["Modify".to_string(), format_timespec(stat.st_mtime)]);
    table.add_row(vec!["Change".to_string(), format_timespec(stat.st_ctime)]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;

    #[test]
    fn test_render_directory() {
        let (_stub, fs) = test_support::mounted();
        fs.mkdir("/x", 0o755).unwrap();
        let stat = fs.stat("/x").unwrap();
        let rendered = render("/x", &stat).to_string();
        assert!(rendered.contains("drwxr-xr-x (0755)"));
        assert!(rendered.contains("1700000000.123456789"));
    }

    #[test]
    fn test_missing_path_has_context() {
        let (_stub, fs) = test_support::mounted();
        let args = Args {
            path: "nope".to_string(),
            json: false,
        };
        let err = execute(&fs, &args).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to stat /nope"));
        assert!(err.downcast_ref::<cephfs_core::Error>().is_some());
    }
}
