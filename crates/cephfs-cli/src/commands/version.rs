//! Version command - show the loaded libcephfs version.
//!
//! Does not mount; only the library handle is created.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use cephfs_core::{CephFs, NativeApi};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::version", skip_all)]
pub fn execute<A: NativeApi>(fs: &CephFs<A>, args: &Args) -> Result<()> {
    let version = fs.version();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&version)?);
    } else if version.text.is_empty() {
        println!(
            "libcephfs {}.{}.{}",
            version.major, version.minor, version.patch
        );
    } else {
        println!(
            "libcephfs {}.{}.{} ({})",
            version.major, version.minor, version.patch, version.text
        );
    }
    Ok(())
}
