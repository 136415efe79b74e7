//! Statfs command - show filesystem capacity.

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use comfy_table::Table;
use tracing::instrument;

use cephfs_core::{CephFs, NativeApi, StatVfs};

use super::normalize_path;
use crate::output::{create_table, format_size};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Any path on the filesystem (default: root)
    #[arg(default_value = "/")]
    pub path: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::statfs", skip_all, fields(path = %args.path))]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let path = normalize_path(&args.path);
    let statvfs = fs
        .statfs(&path)
        .with_context(|| format!("Failed to statfs {path}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&statvfs)?);
    } else {
        println!("{}", render(&statvfs));
    }
    Ok(())
}

fn render(statvfs: &StatVfs) -> Table {
    let used = statvfs.f_blocks.saturating_sub(statvfs.f_bfree);
    let mut table = create_table();
    table.set_header(vec!["Property", "Value"]);
    table.add_row(vec!["Block size".to_string(), format_size(statvfs.f_bsize)]);
    table.add_row(vec!["Size".to_string(), format_size(statvfs.total_bytes())]);
    table.add_row(vec![
        "Used".to_string(),
        format_size(used.saturating_mul(statvfs.f_frsize)),
    ]);
    table.add_row(vec![
        "Available".to_string(),
        format_size(statvfs.available_bytes()),
    ]);
    table.add_row(vec!["Files".to_string(), statvfs.f_files.to_string()]);
    table.add_row(vec!["Max name length".to_string(), statvfs.f_namemax.to_string()]);
    table.add_row(vec!["Filesystem id".to_string(), format!("{:#x}", statvfs.f_fsid)]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;

    #[test]
    fn test_render_capacity() {
        let (_stub, fs) = test_support::mounted();
        let statvfs = fs.statfs("/").unwrap();
        let rendered = render(&statvfs).to_string();
        // 1024 blocks of 4 MiB
        assert!(rendered.contains("4.0G"));
        assert!(rendered.contains("3.0G"));
        assert!(rendered.contains("0xcef5"));
    }
}
